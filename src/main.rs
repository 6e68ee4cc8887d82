// src/main.rs
use std::env;

use dotenvy::dotenv;
use finance_dashboard::{backend, cli, logging, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cfg = Config::from_env()?;

    let args: Vec<String> = env::args().collect();

    if args.len() > 1 && args[1] == "server" {
        logging::init_stdout();
        tracing::info!(addr = %cfg.server_addr, "starting sandbox backend");
        backend::run_server(cfg.server_addr).await?;
    } else {
        let _guard = logging::init_file(&cfg.log_dir);
        tracing::info!(api = %cfg.api_url, "starting dashboard");
        cli::run(&cfg).await?;
    }
    Ok(())
}
