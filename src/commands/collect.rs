use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use crate::App;
use crate::collect::collect_files;
use crate::commands::files_label;
use crate::ops::mcp::McpConnector;

impl<C: McpConnector> App<C> {
    /// Show what a publish would upload, without contacting the server.
    pub async fn cmd_collect(
        &self,
        local_dir: &Path,
        remote_prefix: &str,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        let files = collect_files(local_dir, remote_prefix)?;

        let mut total = 0;
        for file in &files {
            let kind = if file.is_binary() {
                "base64".yellow()
            } else {
                "text  ".green()
            };
            writeln!(stdout, "{} {} ({} bytes)", kind, file.path, file.byte_len())?;
            total += file.byte_len();
        }
        writeln!(
            stdout,
            "{}, {} bytes would be pushed to {}",
            files_label(files.len()),
            total,
            self.config.repository()
        )?;

        Ok(())
    }
}
