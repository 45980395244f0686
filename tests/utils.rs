use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use mcp_git::config::Secret;
use mcp_git::config::ServerConfig;
use mcp_git::ops::mcp::McpConnector;
use mcp_git::ops::mcp::McpSession;
use mcp_git::protocol::mcp::CallToolResult;
use mcp_git::protocol::mcp::Tool;
use serde_json::Value;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::Layer as _;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Writes `files` (relative path, contents) under `dir`, creating parents.
pub fn write_tree(dir: &Path, files: &[(&str, &[u8])]) -> anyhow::Result<()> {
    for (relative, contents) in files {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
    }
    Ok(())
}

pub fn setup_logging() -> anyhow::Result<()> {
    let timer = tracing_subscriber::fmt::time::ChronoLocal::new("%H:%M:%S%.3f".into());
    let format = tracing_subscriber::fmt::format().with_timer(timer);
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?;
    let subscriber = tracing_subscriber::fmt::layer()
        .event_format(format)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .with_test_writer()
        .with_filter(filter);
    tracing_subscriber::registry().with(subscriber).init();
    Ok(())
}

pub enum TestDir {
    Temp(tempfile::TempDir),
    Kept(std::path::PathBuf),
}

impl TestDir {
    pub fn new() -> std::io::Result<Self> {
        let temp_dir = tempfile::tempdir()?;

        if std::env::var("DEBUG_TESTS").is_ok() {
            let path = temp_dir.keep();
            eprintln!("Test directory kept at: {}", path.display());
            Ok(TestDir::Kept(path))
        } else {
            Ok(TestDir::Temp(temp_dir))
        }
    }

    pub fn path(&self) -> &std::path::Path {
        match self {
            TestDir::Temp(t) => t.path(),
            TestDir::Kept(p) => p.as_path(),
        }
    }
}

// -----------------------------------------------------------------------------
// Fake MCP server

/// What the fake server saw.
#[derive(Clone, Default)]
pub struct ServerLog {
    pub calls: Arc<Mutex<Vec<(String, Value)>>>,
    pub tokens: Arc<Mutex<Vec<String>>>,
    pub closed: Arc<Mutex<usize>>,
}

impl ServerLog {
    pub fn tool_names(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn arguments(&self, tool: &str) -> Option<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|(name, _)| name == tool)
            .map(|(_, arguments)| arguments.clone())
    }

    pub fn close_count(&self) -> usize {
        *self.closed.lock().unwrap()
    }
}

/// Offers the GitHub tools and fails the ones listed in `failing`.
#[derive(Default)]
pub struct FakeConnector {
    pub log: ServerLog,
    pub failing: Vec<(&'static str, &'static str)>,
}

pub struct FakeSession {
    log: ServerLog,
    failing: Vec<(&'static str, &'static str)>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, tool: &'static str, message: &'static str) -> Self {
        self.failing.push((tool, message));
        self
    }
}

impl McpConnector for FakeConnector {
    type Session = FakeSession;

    async fn connect(&self, _server: &ServerConfig, token: &Secret) -> anyhow::Result<FakeSession> {
        self.log.tokens.lock().unwrap().push(token.expose().to_string());
        Ok(FakeSession {
            log: self.log.clone(),
            failing: self.failing.clone(),
        })
    }
}

impl McpSession for FakeSession {
    async fn list_tools(&mut self) -> anyhow::Result<Vec<Tool>> {
        Ok(["get_me", "create_branch", "push_files", "create_pull_request"]
            .into_iter()
            .map(Tool::new)
            .collect())
    }

    async fn call_tool(&mut self, name: &str, arguments: Value) -> anyhow::Result<CallToolResult> {
        self.log
            .calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments));

        if let Some((_, message)) = self.failing.iter().find(|(tool, _)| *tool == name) {
            return Ok(CallToolResult::error(*message));
        }
        match name {
            "create_pull_request" => Ok(CallToolResult::success(
                r#"{"html_url":"https://github.com/owner/repo/pull/42"}"#,
            )),
            _ => Ok(CallToolResult::success("{}")),
        }
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        *self.log.closed.lock().unwrap() += 1;
        Ok(())
    }
}
