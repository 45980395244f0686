use anyhow::Result;
use tracing::warn;

use crate::config::Config;
use crate::config::Secret;
use crate::ops::mcp::McpConnector;
use crate::ops::mcp::McpSession;

pub struct App<C> {
    pub config: Config,
    pub connector: C,
}

impl<C: McpConnector> App<C> {
    pub fn new(config: Config, connector: C) -> Self {
        Self { config, connector }
    }
}

/// Shared helper methods for App
impl<C: McpConnector> App<C> {
    /// Start a session with the configured MCP server.
    pub(crate) async fn open_session(&self, token: &Secret) -> Result<C::Session> {
        self.connector.connect(&self.config.server, token).await
    }

    /// Release a session. Errors while releasing are logged, not returned.
    pub(crate) async fn release_session(&self, mut session: C::Session) {
        if let Err(err) = session.close().await {
            warn!(error = %format!("{:#}", err), "failed to release MCP session");
        }
    }
}
