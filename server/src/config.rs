//! Command-line and environment configuration

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "kanban-server", about = "Board service for ordered lists and cards")]
pub struct ServerArgs {
    /// Address to listen on
    #[arg(long, env = "KANBAN_ADDR", default_value = "127.0.0.1:8787")]
    pub addr: SocketAddr,

    /// SQLite database file (`:memory:` for a throwaway database)
    #[arg(long, env = "KANBAN_DB_PATH", default_value = "kanban.db")]
    pub db_path: PathBuf,

    /// Directory for rolling log files
    #[arg(long, env = "KANBAN_LOG_DIR", default_value = "logs")]
    pub log_dir: PathBuf,
}
