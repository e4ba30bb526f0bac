pub mod logger;
pub mod server;
pub mod static_files;
