#![allow(non_snake_case)]

use caldavAvailability::cli;
use caldavAvailability::config::AppConfig;

#[tokio::main]
async fn main() {
    let config = AppConfig::load();
    if let Err(e) = cli::cli(config).await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
