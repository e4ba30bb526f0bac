use clap::Parser;
use log::info;
use poll_static_server::logger;
use poll_static_server::server::HttpServer;
use poll_static_server::server::config::ServerConfig;

fn main() -> std::io::Result<()> {
    let config = ServerConfig::parse();
    logger::init(&config.log_file, config.log_timezone)?;

    info!("Starting static HTTP server with config: {:?}", config);

    let mut server = HttpServer::new(&config)?;
    server.run()
}
