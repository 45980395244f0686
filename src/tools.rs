use std::collections::HashMap;

use anyhow::Result;
use anyhow::anyhow;
use anyhow::bail;
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use crate::collect::FileRecord;
use crate::ops::mcp::McpSession;
use crate::protocol::mcp::Tool;

pub const CREATE_BRANCH: &str = "create_branch";
pub const PUSH_FILES: &str = "push_files";
pub const CREATE_PULL_REQUEST: &str = "create_pull_request";

/// Tools a publish run cannot do without.
pub const REQUIRED_TOOLS: [&str; 3] = [CREATE_BRANCH, PUSH_FILES, CREATE_PULL_REQUEST];

// -----------------------------------------------------------------------------
// Handles

/// A tool resolved from the server's catalog.
#[derive(Debug, Clone)]
pub struct ToolHandle {
    tool: Tool,
}

impl ToolHandle {
    pub fn name(&self) -> &str {
        &self.tool.name
    }

    /// Call the tool and return its text output.
    ///
    /// A result flagged `isError` by the server is turned into an error.
    #[instrument(skip_all, fields(tool = %self.tool.name))]
    pub async fn invoke<S: McpSession>(
        &self,
        session: &mut S,
        arguments: &impl Serialize,
    ) -> Result<String> {
        let arguments = serde_json::to_value(arguments)?;
        let result = session.call_tool(&self.tool.name, arguments).await?;
        let text = result.text();
        if result.is_error {
            bail!("{} failed: {}", self.tool.name, text);
        }
        Ok(text)
    }
}

/// The three tools a publish run calls, resolved up front.
#[derive(Debug, Clone)]
pub struct PublishTools {
    pub create_branch: ToolHandle,
    pub push_files: ToolHandle,
    pub create_pull_request: ToolHandle,
}

impl PublishTools {
    pub fn resolve(catalog: Vec<Tool>) -> Result<Self> {
        let mut by_name: HashMap<String, Tool> = catalog
            .into_iter()
            .map(|tool| (tool.name.clone(), tool))
            .collect();
        let mut take = |name: &str| {
            by_name
                .remove(name)
                .map(|tool| ToolHandle { tool })
                .ok_or_else(|| anyhow!("MCP server does not provide the `{}` tool", name))
        };

        Ok(Self {
            create_branch: take(CREATE_BRANCH)?,
            push_files: take(PUSH_FILES)?,
            create_pull_request: take(CREATE_PULL_REQUEST)?,
        })
    }
}

// -----------------------------------------------------------------------------
// Arguments

#[derive(Debug, Serialize)]
pub struct CreateBranchArgs<'a> {
    pub owner: &'a str,
    pub repo: &'a str,
    pub branch: &'a str,
    pub from_branch: &'a str,
}

#[derive(Debug, Serialize)]
pub struct PushFilesArgs<'a> {
    pub owner: &'a str,
    pub repo: &'a str,
    pub branch: &'a str,
    pub files: &'a [FileRecord],
    pub message: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CreatePullRequestArgs<'a> {
    pub owner: &'a str,
    pub repo: &'a str,
    pub title: &'a str,
    pub body: &'a str,
    pub head: &'a str,
    pub base: &'a str,
}

// -----------------------------------------------------------------------------
// Results

/// What happened when asking for the branch.
#[derive(Debug)]
pub enum BranchOutcome {
    Created,
    AlreadyExists,
    /// Any other failure. Publishing still continues.
    Failed(anyhow::Error),
}

impl BranchOutcome {
    pub fn from_result(result: Result<String>) -> Self {
        match result {
            Ok(_) => Self::Created,
            Err(err) if format!("{:#}", err).to_lowercase().contains("already exists") => {
                Self::AlreadyExists
            }
            Err(err) => Self::Failed(err),
        }
    }
}

/// Pull the web URL out of a `create_pull_request` response, if it is JSON.
pub fn pull_request_url(response: &str) -> Option<String> {
    let value: Value = serde_json::from_str(response).ok()?;
    ["html_url", "url"]
        .iter()
        .find_map(|key| value.get(*key)?.as_str().map(str::to_string))
}
