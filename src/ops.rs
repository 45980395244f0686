//! Operations modules for interacting with external systems.
//!
//! - [`mcp`]: sessions with an MCP tool server (the GitHub MCP server in production)
//!
//! The module provides trait-based abstractions with real and mock implementations
//! to support both production use and testing.

pub mod mcp;
