use std::path::PathBuf;
use std::time::Duration;

use crate::download::DownloadOptions;
use crate::types::{Category, LogLevel};

/// HTTP proxy settings; credentials are optional.
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    pub login: Option<String>,
    pub password: Option<String>,
}

impl ProxyConfig {
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl std::fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("login", &self.login)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Application configuration.
pub struct Config {
    pub access_token: String,
    pub directory: PathBuf,
    pub categories: Vec<Category>,
    pub proxy: Option<ProxyConfig>,
    pub timeout: Duration,
    pub max_pages: Option<u32>,
    pub threads_num: u16,
    pub log_level: LogLevel,
    pub dry_run: bool,
    pub no_progress_bar: bool,
    pub set_mtime: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("access_token", &"<redacted>")
            .field("directory", &self.directory)
            .field("categories", &self.categories)
            .field("proxy", &self.proxy)
            .field("timeout", &self.timeout)
            .field("max_pages", &self.max_pages)
            .field("threads_num", &self.threads_num)
            .field("log_level", &self.log_level)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Config {
    pub fn from_cli(cli: crate::cli::Cli) -> anyhow::Result<Self> {
        if cli.access_token.trim().is_empty() {
            anyhow::bail!("--access-token must not be empty");
        }
        if cli.timeout == 0 {
            anyhow::bail!("--timeout must be at least 1 second");
        }

        let proxy = match cli.proxy_host {
            Some(host) => Some(ProxyConfig {
                host,
                port: cli.proxy_port,
                login: cli.proxy_login,
                password: cli.proxy_password,
            }),
            None if cli.proxy_login.is_some() || cli.proxy_password.is_some() => {
                anyhow::bail!("--proxy-login/--proxy-password given without --proxy-host")
            }
            None => None,
        };

        // Fixed processing order, duplicates dropped.
        let categories = if cli.categories.is_empty() {
            Category::ALL.to_vec()
        } else {
            let mut categories = cli.categories;
            categories.sort();
            categories.dedup();
            categories
        };

        Ok(Self {
            access_token: cli.access_token,
            directory: expand_tilde(&cli.directory),
            categories,
            proxy,
            timeout: Duration::from_secs(cli.timeout),
            max_pages: cli.max_pages,
            threads_num: cli.threads_num,
            log_level: cli.log_level,
            dry_run: cli.dry_run,
            no_progress_bar: cli.no_progress_bar,
            set_mtime: !cli.no_set_mtime,
        })
    }

    pub fn download_options(&self) -> DownloadOptions {
        DownloadOptions {
            concurrency: self.threads_num as usize,
            dry_run: self.dry_run,
            no_progress_bar: self.no_progress_bar,
            set_mtime: self.set_mtime,
        }
    }

    pub fn category_root(&self, category: Category) -> PathBuf {
        self.directory.join(category.folder())
    }
}
