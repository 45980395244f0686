use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use colored::Colorize;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use crate::App;
use crate::collect::FileRecord;
use crate::collect::collect_files;
use crate::commands::files_label;
use crate::config::Secret;
use crate::ops::mcp::McpConnector;
use crate::ops::mcp::McpSession;
use crate::tools::BranchOutcome;
use crate::tools::CreateBranchArgs;
use crate::tools::CreatePullRequestArgs;
use crate::tools::PublishTools;
use crate::tools::PushFilesArgs;
use crate::tools::pull_request_url;

/// Everything a single publish run needs from the caller.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    /// Local directory whose files are uploaded.
    pub local_dir: PathBuf,
    /// Remote directory the files land under, e.g. `alice/`.
    pub remote_prefix: String,
    pub branch: String,
    /// Pull request title, also used as the commit message.
    pub title: String,
    pub body: String,
    pub token: Secret,
}

impl<C: McpConnector> App<C> {
    /// Publish a local directory as a pull request.
    ///
    /// 1. Collect the files under the local directory.
    /// 2. Create the branch from the base branch. Failure here is reported and
    ///    ignored.
    /// 3. Push all files to the branch in a single commit.
    /// 4. Open a pull request from the branch into the base branch.
    ///
    /// The MCP session is released whether or not the steps succeed.
    #[instrument(skip_all, fields(branch = %request.branch))]
    pub async fn cmd_publish(
        &self,
        request: &PublishRequest,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        let files = collect_files(&request.local_dir, &request.remote_prefix)?;
        let binary = files.iter().filter(|file| file.is_binary()).count();
        writeln!(
            stdout,
            "Collected {} ({} text, {} base64)",
            files_label(files.len()),
            files.len() - binary,
            binary
        )?;

        let mut session = self.open_session(&request.token).await?;
        let result = self.publish(&mut session, request, &files, stdout).await;
        self.release_session(session).await;
        result
    }

    async fn publish(
        &self,
        session: &mut C::Session,
        request: &PublishRequest,
        files: &[FileRecord],
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        let tools = PublishTools::resolve(session.list_tools().await?)?;
        let owner = self.config.owner.as_str();
        let repo = self.config.repo.as_str();
        let base = self.config.base_branch.as_str();
        let branch = request.branch.as_str();

        let created = tools
            .create_branch
            .invoke(
                session,
                &CreateBranchArgs {
                    owner,
                    repo,
                    branch,
                    from_branch: base,
                },
            )
            .await;
        match BranchOutcome::from_result(created) {
            BranchOutcome::Created => {
                writeln!(stdout, "{} Created branch {} from {}", "✓".green(), branch, base)?
            }
            BranchOutcome::AlreadyExists => writeln!(
                stdout,
                "{} Branch {} already exists, continuing",
                "ℹ".blue(),
                branch
            )?,
            BranchOutcome::Failed(err) => {
                warn!(error = %format!("{:#}", err), "branch creation failed");
                writeln!(
                    stdout,
                    "{} Could not create branch {}, continuing: {:#}",
                    "ℹ".blue(),
                    branch,
                    err
                )?
            }
        }

        tools
            .push_files
            .invoke(
                session,
                &PushFilesArgs {
                    owner,
                    repo,
                    branch,
                    files,
                    message: &request.title,
                },
            )
            .await
            .with_context(|| format!("Failed to push files to branch {}", branch))?;
        writeln!(
            stdout,
            "{} Pushed {} to {} on {}",
            "✓".green(),
            files_label(files.len()),
            self.config.repository(),
            branch
        )?;

        let response = tools
            .create_pull_request
            .invoke(
                session,
                &CreatePullRequestArgs {
                    owner,
                    repo,
                    title: &request.title,
                    body: &request.body,
                    head: branch,
                    base,
                },
            )
            .await
            .with_context(|| format!("Failed to create PR for {}", branch))?;
        match pull_request_url(&response) {
            Some(url) => writeln!(stdout, "{} Created PR: {}", "✓".green(), url)?,
            None => writeln!(
                stdout,
                "{} Created PR for {} with base {}",
                "✓".green(),
                branch,
                base
            )?,
        }

        info!(files = files.len(), "publish complete");
        Ok(())
    }
}
