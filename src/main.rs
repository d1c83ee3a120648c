use std::cell::RefCell;
use std::env;
use std::process::ExitCode;
use std::rc::Rc;

use task_schedule::config::{help_text, ServerConfig};
use task_schedule::mcp::McpServer;
use task_schedule::task_store::TaskStore;
use task_schedule::tools::register_tools;
use task_schedule::utils::{ensure_dir, parse_args};

fn main() -> ExitCode {
    let argv: Vec<String> = env::args().skip(1).collect();
    let config = ServerConfig::from_args(&parse_args(&argv));
    if config.show_help {
        println!("{}", help_text());
        return ExitCode::SUCCESS;
    }

    // stdout carries the protocol, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Some(dir) = config.db_dir() {
        if let Err(err) = ensure_dir(&dir) {
            tracing::error!(dir = %dir.display(), error = %err, "failed to create state directory");
            return ExitCode::FAILURE;
        }
    }

    let db_path = config.db_path.to_string_lossy().to_string();
    let store = match TaskStore::new(&db_path) {
        Ok(store) => Rc::new(RefCell::new(store)),
        Err(err) => {
            tracing::error!(db = %db_path, error = %err, "failed to open task db");
            return ExitCode::FAILURE;
        }
    };

    let mut server = McpServer::new(config.server_name.clone(), env!("CARGO_PKG_VERSION"));
    register_tools(&mut server, store);
    tracing::info!(server = %config.server_name, db = %db_path, "task schedule server ready");

    if let Err(err) = server.run_stdio() {
        tracing::error!(server = %config.server_name, error = %err, "server crashed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
