use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use mcp_git::App;
use mcp_git::Config;
use mcp_git::PublishRequest;
use mcp_git::config::DEFAULT_BASE_BRANCH;
use mcp_git::config::DEFAULT_OWNER;
use mcp_git::config::DEFAULT_REPO;
use mcp_git::config::DEFAULT_SERVER_IMAGE;
use mcp_git::config::Secret;
use mcp_git::config::ServerConfig;
use mcp_git::config::TOKEN_ENV;
use mcp_git::ops::mcp::StdioConnector;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::Layer as _;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

#[derive(Parser)]
#[command(name = "mcp-git")]
#[command(
    about = "Publish a local directory as a GitHub pull request via the GitHub MCP server",
    long_about = None
)]
pub struct Cli {
    #[command(flatten)]
    pub target: TargetArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where pull requests go and which server performs them.
#[derive(Args)]
pub struct TargetArgs {
    /// Repository owner
    #[arg(long, global = true, env = "MCP_GIT_OWNER", default_value = DEFAULT_OWNER)]
    pub owner: String,
    /// Repository name
    #[arg(long, global = true, env = "MCP_GIT_REPO", default_value = DEFAULT_REPO)]
    pub repo: String,
    /// Branch to cut from and open the PR against
    #[arg(long, global = true, env = "MCP_GIT_BASE", default_value = DEFAULT_BASE_BRANCH)]
    pub base: String,
    /// GitHub MCP server container image
    #[arg(long, global = true, env = "MCP_GIT_IMAGE", default_value = DEFAULT_SERVER_IMAGE)]
    pub image: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a branch, push a directory to it and open a PR
    Publish {
        /// Local directory to upload
        dir: PathBuf,
        /// Remote directory the files are placed under (e.g. "alice/")
        #[arg(short, long, default_value = "")]
        prefix: String,
        /// Branch to push to (created if missing)
        #[arg(short, long)]
        branch: String,
        /// PR title, also used as the commit message
        #[arg(short, long)]
        title: String,
        /// PR body (Markdown)
        #[arg(long, default_value = "")]
        body: String,
        /// GitHub personal access token
        #[arg(long, env = TOKEN_ENV, hide_env_values = true)]
        token: String,
    },
    /// Show the files a publish would upload
    Collect {
        /// Local directory to upload
        dir: PathBuf,
        /// Remote directory the files are placed under (e.g. "alice/")
        #[arg(short, long, default_value = "")]
        prefix: String,
    },
    /// List the tools the MCP server offers
    Tools {
        /// GitHub personal access token
        #[arg(long, env = TOKEN_ENV, hide_env_values = true)]
        token: String,
    },
}

impl TargetArgs {
    fn config(self) -> Config {
        Config::new(self.owner, self.repo)
            .with_base_branch(self.base)
            .with_server(ServerConfig::docker(&self.image))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let cli = Cli::parse();
    let app = App::new(cli.target.config(), StdioConnector);

    match cli.command {
        Commands::Publish {
            dir,
            prefix,
            branch,
            title,
            body,
            token,
        } => {
            let request = PublishRequest {
                local_dir: dir,
                remote_prefix: prefix,
                branch,
                title,
                body,
                token: Secret::new(token),
            };
            app.cmd_publish(&request, &mut std::io::stdout()).await?
        }
        Commands::Collect { dir, prefix } => {
            app.cmd_collect(&dir, &prefix, &mut std::io::stdout()).await?
        }
        Commands::Tools { token } => {
            app.cmd_tools(&Secret::new(token), &mut std::io::stdout())
                .await?
        }
    }

    Ok(())
}

/// Log to stderr so stdout only carries progress output. `RUST_LOG` overrides
/// the default `warn` level.
fn setup_logging() -> Result<()> {
    let timer = tracing_subscriber::fmt::time::ChronoLocal::new("%H:%M:%S%.3f".into());
    let format = tracing_subscriber::fmt::format().with_timer(timer);
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env()?;
    let subscriber = tracing_subscriber::fmt::layer()
        .event_format(format)
        .with_writer(std::io::stderr)
        .with_filter(filter);
    tracing_subscriber::registry().with(subscriber).init();
    Ok(())
}
