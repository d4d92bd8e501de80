use clap::Parser;

use crate::graph::transport::DEFAULT_TIMEOUT_SECS;
use crate::types::*;

#[derive(Parser, Debug)]
#[command(name = "fbbackup-rs", about = "Back up your Facebook photos and videos")]
pub struct Cli {
    /// Graph API access token.
    /// WARNING: passing via --access-token is visible in process listings.
    /// Prefer the FB_ACCESS_TOKEN environment variable instead.
    #[arg(short = 't', long, env = "FB_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: String,

    /// Local directory for the backup
    #[arg(short = 'd', long, default_value = "facebook_backup")]
    pub directory: String,

    /// Category to back up (repeatable; default: all)
    #[arg(short = 'c', long = "category", value_enum)]
    pub categories: Vec<Category>,

    /// HTTP proxy host
    #[arg(long)]
    pub proxy_host: Option<String>,

    /// HTTP proxy port
    #[arg(long, default_value_t = 8080)]
    pub proxy_port: u16,

    /// HTTP proxy login
    #[arg(long)]
    pub proxy_login: Option<String>,

    /// HTTP proxy password
    #[arg(long, env = "FB_PROXY_PASSWORD", hide_env_values = true)]
    pub proxy_password: Option<String>,

    /// Connect and read timeout in seconds. A download that keeps
    /// receiving data is never cut off.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Number of concurrent downloads
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u16).range(1..))]
    pub threads_num: u16,

    /// Stop following pagination cursors after this many pages per category
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_pages: Option<u32>,

    /// List what would be downloaded without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Disable progress bar
    #[arg(long)]
    pub no_progress_bar: bool,

    /// Keep the download time as file mtime instead of the asset's creation time
    #[arg(long)]
    pub no_set_mtime: bool,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["fbbackup-rs", "--access-token", "T"]).unwrap();
        assert_eq!(cli.directory, "facebook_backup");
        assert!(cli.categories.is_empty());
        assert_eq!(cli.timeout, DEFAULT_TIMEOUT_SECS);
        assert_eq!(cli.threads_num, 4);
        assert_eq!(cli.proxy_port, 8080);
        assert_eq!(cli.log_level, LogLevel::Info);
        assert!(cli.max_pages.is_none());
    }

    #[test]
    fn test_repeated_categories() {
        let cli = Cli::try_parse_from([
            "fbbackup-rs",
            "-t",
            "T",
            "-c",
            "my-videos",
            "--category",
            "photos-of-me",
        ])
        .unwrap();
        assert_eq!(cli.categories, vec![Category::MyVideos, Category::PhotosOfMe]);
    }

    #[test]
    fn test_zero_threads_rejected() {
        assert!(Cli::try_parse_from(["fbbackup-rs", "-t", "T", "--threads-num", "0"]).is_err());
    }

    #[test]
    fn test_zero_max_pages_rejected() {
        assert!(Cli::try_parse_from(["fbbackup-rs", "-t", "T", "--max-pages", "0"]).is_err());
    }
}
