use chrono_tz::Tz;
use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Legacy path answered with `302 Found`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub from: String,
    pub to: String,
}

impl FromStr for Redirect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (from, to) = s
            .split_once('=')
            .ok_or_else(|| format!("expected FROM=TO, got {:?}", s))?;
        if !from.starts_with('/') {
            return Err(format!("redirect source must start with '/': {:?}", from));
        }
        if to.is_empty() {
            return Err("redirect target must not be empty".to_string());
        }
        Ok(Self {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

fn parse_timezone(s: &str) -> Result<Tz, String> {
    s.parse::<Tz>().map_err(|e| e.to_string())
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct ServerConfig {
    /// Address to bind
    pub host: String,

    /// Port to bind
    pub port: u16,

    /// Directory files are served from
    #[arg(short, long, default_value = "config/www/html")]
    pub document_root: PathBuf,

    /// Document served for `/`
    #[arg(long, default_value = "index.html")]
    pub index: String,

    /// Body of 404 responses
    #[arg(long, default_value = "config/404.html")]
    pub not_found_page: PathBuf,

    /// Body of 405 responses
    #[arg(long, default_value = "config/405.html")]
    pub not_allowed_page: PathBuf,

    /// Legacy alias answered with a redirect, as FROM=TO (repeatable)
    #[arg(long = "redirect", value_name = "FROM=TO", default_value = "/oldpage.html=/index.html")]
    pub redirects: Vec<Redirect>,

    /// Listen backlog
    #[arg(long, default_value_t = 1)]
    pub backlog: i32,

    /// Maximum number of simultaneous connections
    #[arg(long, default_value_t = 1024)]
    pub max_connections: usize,

    /// Receive buffer size per connection, in bytes
    #[arg(long, default_value_t = 8192)]
    pub recv_buffer_size: usize,

    /// File chunk buffer size per connection, in bytes
    #[arg(long, default_value_t = 4096)]
    pub chunk_size: usize,

    /// Poll timeout in milliseconds (waits indefinitely when unset)
    #[arg(long)]
    pub poll_timeout_ms: Option<u64>,

    /// File every log record is appended to
    #[arg(long, default_value = "server.log")]
    pub log_file: PathBuf,

    /// Time zone of log timestamps
    #[arg(long, default_value = "UTC", value_parser = parse_timezone)]
    pub log_timezone: Tz,
}

impl ServerConfig {
    pub fn poll_timeout(&self) -> Option<Duration> {
        self.poll_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            document_root: PathBuf::from("config/www/html"),
            index: "index.html".to_string(),
            not_found_page: PathBuf::from("config/404.html"),
            not_allowed_page: PathBuf::from("config/405.html"),
            redirects: vec![Redirect {
                from: "/oldpage.html".to_string(),
                to: "/index.html".to_string(),
            }],
            backlog: 1,
            max_connections: 1024,
            recv_buffer_size: 8192,
            chunk_size: 4096,
            poll_timeout_ms: None,
            log_file: PathBuf::from("server.log"),
            log_timezone: Tz::UTC,
        }
    }
}
