use clap::Parser;
use kanban_server::{ServerArgs, ServerError};

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let args = ServerArgs::parse();
    rolling_logger::init_logger(&args.log_dir, "kanban-server")?;
    let result = kanban_server::run(args).await;
    rolling_logger::shutdown()?;
    result
}
