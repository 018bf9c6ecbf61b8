use rankings::{Config, app};
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = Config::from_env();

    // Optional bind address as the first argument
    if let Some(addr) = env::args().nth(1) {
        config.addr = addr;
    }

    app::run(config).await
}
