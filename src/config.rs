use std::fmt;

/// Default owner of the repository pull requests are opened against.
pub const DEFAULT_OWNER: &str = "SGCS-Release-Git-Project";
/// Default repository pull requests are opened against.
pub const DEFAULT_REPO: &str = "release-collect-game";
/// Branch new branches are cut from and pull requests target.
pub const DEFAULT_BASE_BRANCH: &str = "main";
/// Container image of the GitHub MCP server.
pub const DEFAULT_SERVER_IMAGE: &str = "ghcr.io/github/github-mcp-server";
/// Environment variable the GitHub MCP server reads its token from.
pub const TOKEN_ENV: &str = "GITHUB_PERSONAL_ACCESS_TOKEN";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub owner: String,
    pub repo: String,
    pub base_branch: String,
    pub server: ServerConfig,
}

/// How to launch the MCP server subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub command: String,
    pub args: Vec<String>,
    /// Name of the environment variable the token is passed in.
    pub token_env: String,
}

/// A credential that must never end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Config {
    pub fn new(owner: String, repo: String) -> Self {
        Self {
            owner,
            repo,
            ..Self::default()
        }
    }

    pub fn with_base_branch(mut self, base_branch: String) -> Self {
        self.base_branch = base_branch;
        self
    }

    pub fn with_server(mut self, server: ServerConfig) -> Self {
        self.server = server;
        self
    }

    /// `owner/repo`
    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Default config for tests
    pub fn default_for_tests() -> Self {
        Self::new("test-owner".to_string(), "test-repo".to_string())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            owner: DEFAULT_OWNER.to_string(),
            repo: DEFAULT_REPO.to_string(),
            base_branch: DEFAULT_BASE_BRANCH.to_string(),
            server: ServerConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Run `image` with docker, forwarding the token variable into the container.
    pub fn docker(image: &str) -> Self {
        Self {
            command: "docker".to_string(),
            args: vec![
                "run".to_string(),
                "-i".to_string(),
                "--rm".to_string(),
                "-e".to_string(),
                TOKEN_ENV.to_string(),
                image.to_string(),
            ],
            token_env: TOKEN_ENV.to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::docker(DEFAULT_SERVER_IMAGE)
    }
}

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}
