pub mod config;
pub mod connection;
pub mod disconnector;
pub mod event_loop;
pub mod http_status;
pub mod mime;
pub mod net;
pub mod poller;
pub mod registry;
pub mod request_handler;
pub mod request_parser;
pub mod responder;
pub mod response;

use log::info;
use std::fs;
use std::io;
use std::path::Path;

use crate::static_files::error_pages;
use config::ServerConfig;
use event_loop::EventLoop;

pub struct HttpServer {
    config: ServerConfig,
    event_loop: EventLoop,
}

impl HttpServer {
    pub fn new(config: &ServerConfig) -> io::Result<Self> {
        let addr = net::resolve(&config.host, config.port)?;
        let listener = net::bind_listener(addr, config.backlog)?;

        info!(
            "Server listening on {} (backlog {})",
            listener.local_addr()?,
            config.backlog
        );

        Ok(Self {
            config: config.clone(),
            event_loop: EventLoop::new(listener, config),
        })
    }

    pub fn event_loop(&mut self) -> &mut EventLoop {
        &mut self.event_loop
    }

    pub fn run(&mut self) -> io::Result<()> {
        self.create_default_files()?;
        info!(
            "Serving {:?} with up to {} connections",
            self.config.document_root, self.config.max_connections
        );
        self.event_loop.run()
    }

    /// Creates the document root and any missing error page. Existing files
    /// are left alone.
    pub fn create_default_files(&self) -> io::Result<()> {
        if !self.config.document_root.exists() {
            fs::create_dir_all(&self.config.document_root)?;
            info!("Created document root {:?}", self.config.document_root);
        }

        write_if_missing(&self.config.not_found_page, error_pages::not_found())?;
        write_if_missing(&self.config.not_allowed_page, error_pages::method_not_allowed())?;
        Ok(())
    }
}

fn write_if_missing(path: &Path, contents: &str) -> io::Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    info!("Created default page {:?}", path);
    Ok(())
}
