#![allow(async_fn_in_trait)]

use std::collections::HashSet;
use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
#[cfg(test)]
use mockall::automock;
use serde_json::Value;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncWrite;
use tokio::io::BufReader;
use tokio::process::Child;
use tokio::process::ChildStdin;
use tokio::process::ChildStdout;
use tokio::process::Command;
use tracing::debug;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use crate::config::Secret;
use crate::config::ServerConfig;
use crate::protocol::mcp::CallToolParams;
use crate::protocol::mcp::CallToolResult;
use crate::protocol::mcp::InitializeParams;
use crate::protocol::mcp::InitializeResult;
use crate::protocol::mcp::ListToolsParams;
use crate::protocol::mcp::ListToolsResult;
use crate::protocol::mcp::METHOD_INITIALIZE;
use crate::protocol::mcp::METHOD_INITIALIZED;
use crate::protocol::mcp::METHOD_TOOLS_CALL;
use crate::protocol::mcp::METHOD_TOOLS_LIST;
use crate::protocol::mcp::Tool;
use crate::transport::JsonRpcChannel;

/// How long the server gets to exit after its stdin is closed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

// -----------------------------------------------------------------------------
// Traits

/// An open session with an MCP server.
#[cfg_attr(test, automock)]
pub trait McpSession {
    /// Every tool the server advertises, across all catalog pages.
    async fn list_tools(&mut self) -> Result<Vec<Tool>>;

    /// Call a tool by name. A result with `is_error` set is still `Ok` here.
    async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<CallToolResult>;

    /// Release the session and whatever backs it.
    async fn close(&mut self) -> Result<()>;
}

/// Opens sessions with an MCP server.
#[cfg_attr(test, automock(type Session = MockMcpSession;))]
pub trait McpConnector {
    type Session: McpSession;

    async fn connect(&self, server: &ServerConfig, token: &Secret) -> Result<Self::Session>;
}

// -----------------------------------------------------------------------------
// McpClient

/// MCP requests over a JSON-RPC channel.
pub struct McpClient<R, W> {
    channel: JsonRpcChannel<R, W>,
}

impl<R, W> McpClient<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Perform the MCP handshake.
    pub async fn initialize(reader: R, writer: W) -> Result<(Self, InitializeResult)> {
        let mut channel = JsonRpcChannel::new(reader, writer);
        let params = serde_json::to_value(InitializeParams::new())?;
        let init: InitializeResult = channel
            .request(METHOD_INITIALIZE, Some(params))
            .await
            .context("MCP handshake failed")?;
        channel.notify(METHOD_INITIALIZED, None).await?;
        Ok((Self { channel }, init))
    }

    #[instrument(skip_all)]
    pub async fn list_tools(&mut self) -> Result<Vec<Tool>> {
        let mut tools = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = None;
        loop {
            let params = serde_json::to_value(ListToolsParams { cursor })?;
            let page: ListToolsResult = self
                .channel
                .request(METHOD_TOOLS_LIST, Some(params))
                .await?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) => {
                    if !seen.insert(next.clone()) {
                        bail!("MCP server repeated tools/list cursor `{}`", next);
                    }
                    cursor = Some(next);
                }
                None => break,
            }
        }
        debug!(count = tools.len(), "listed tools");
        Ok(tools)
    }

    #[instrument(skip(self, arguments))]
    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<CallToolResult> {
        let params = serde_json::to_value(CallToolParams { name, arguments })?;
        self.channel.request(METHOD_TOOLS_CALL, Some(params)).await
    }
}

// -----------------------------------------------------------------------------
// Stdio implementation

/// Spawns the MCP server as a subprocess and talks to it over stdio.
pub struct StdioConnector;

/// A session backed by a server subprocess.
///
/// The child is killed if the session is dropped without being closed.
pub struct StdioSession {
    child: Child,
    client: Option<McpClient<BufReader<ChildStdout>, ChildStdin>>,
}

impl McpConnector for StdioConnector {
    type Session = StdioSession;

    #[instrument(skip_all, fields(command = %server.command))]
    async fn connect(&self, server: &ServerConfig, token: &Secret) -> Result<StdioSession> {
        let mut child = Command::new(&server.command)
            .args(&server.args)
            .env(&server.token_env, token.expose())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start MCP server `{}`", server.command))?;

        let stdin = child.stdin.take().context("MCP server stdin is not piped")?;
        let stdout = child.stdout.take().context("MCP server stdout is not piped")?;

        let (client, init) = McpClient::initialize(BufReader::new(stdout), stdin).await?;
        match &init.server_info {
            Some(server_info) => info!(
                server = %server_info.name,
                version = %server_info.version,
                protocol = %init.protocol_version,
                "connected to MCP server"
            ),
            None => info!(protocol = %init.protocol_version, "connected to MCP server"),
        }

        Ok(StdioSession {
            child,
            client: Some(client),
        })
    }
}

impl StdioSession {
    fn client(&mut self) -> Result<&mut McpClient<BufReader<ChildStdout>, ChildStdin>> {
        self.client.as_mut().context("MCP session is already closed")
    }
}

impl McpSession for StdioSession {
    async fn list_tools(&mut self) -> Result<Vec<Tool>> {
        self.client()?.list_tools().await
    }

    async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<CallToolResult> {
        self.client()?.call_tool(name, arguments).await
    }

    #[instrument(skip_all)]
    async fn close(&mut self) -> Result<()> {
        // Closing stdin tells the server to exit.
        drop(self.client.take());

        let exited = tokio::time::timeout(SHUTDOWN_GRACE, self.child.wait()).await;
        match exited {
            Ok(status) => {
                let status = status.context("Failed to wait for MCP server")?;
                debug!(%status, "MCP server exited");
            }
            Err(_) => {
                warn!("MCP server did not exit after stdin closed, killing it");
                self.child
                    .kill()
                    .await
                    .context("Failed to kill MCP server")?;
            }
        }
        Ok(())
    }
}
