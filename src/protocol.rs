//! Wire types for talking to an MCP server.
//!
//! - [`jsonrpc`]: JSON-RPC 2.0 envelopes shared by every message
//! - [`mcp`]: Model Context Protocol payloads (handshake, tool catalog, tool calls)

pub mod jsonrpc;
pub mod mcp;
