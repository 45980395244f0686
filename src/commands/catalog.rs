use anyhow::Result;
use colored::Colorize;

use crate::App;
use crate::config::Secret;
use crate::ops::mcp::McpConnector;
use crate::ops::mcp::McpSession;
use crate::tools::REQUIRED_TOOLS;

impl<C: McpConnector> App<C> {
    /// List the tools the MCP server offers and check the ones publishing needs.
    pub async fn cmd_tools(&self, token: &Secret, stdout: &mut impl std::io::Write) -> Result<()> {
        let mut session = self.open_session(token).await?;
        let catalog = session.list_tools().await;
        self.release_session(session).await;
        let catalog = catalog?;

        for tool in &catalog {
            let summary = tool.summary();
            if summary.is_empty() {
                writeln!(stdout, "{}", tool.name.cyan())?;
            } else {
                writeln!(stdout, "{} {}", tool.name.cyan(), summary.dimmed())?;
            }
        }

        writeln!(stdout)?;
        for required in REQUIRED_TOOLS {
            if catalog.iter().any(|tool| tool.name == required) {
                writeln!(stdout, "{} {}", "✓".green(), required)?;
            } else {
                writeln!(stdout, "{} {} (missing)", "✗".red(), required)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ops::mcp::MockMcpConnector;
    use crate::ops::mcp::MockMcpSession;
    use crate::protocol::mcp::Tool;

    #[tokio::test]
    async fn test_cmd_tools_marks_missing_tools() {
        let mut session = MockMcpSession::new();
        session.expect_list_tools().returning(|| {
            let mut branch = Tool::new("create_branch");
            branch.description = Some("Create a new branch in a GitHub repository".to_string());
            Ok(vec![branch, Tool::new("get_me")])
        });
        session.expect_close().times(1).returning(|| Ok(()));

        let mut connector = MockMcpConnector::new();
        connector
            .expect_connect()
            .return_once(move |_, _| Ok(session));
        let app = App::new(Config::default_for_tests(), connector);

        let mut out = Vec::new();
        app.cmd_tools(&Secret::new("t"), &mut out).await.unwrap();

        insta::assert_snapshot!(String::from_utf8(out).unwrap(), @r"
        create_branch Create a new branch in a GitHub repository
        get_me

        ✓ create_branch
        ✗ push_files (missing)
        ✗ create_pull_request (missing)
        ");
    }
}
