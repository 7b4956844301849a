#![cfg(not(tarpaulin_include))]

use backlog::{app, Config};
use std::env;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    if args.len() > 2 {
        eprintln!("Usage: {} [config.toml]", args[0]);
        return Ok(());
    }

    let config_path = args.get(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();
    log::debug!("configuration: {:?}", config);

    println!("Backlog tracker - type 'help' for commands");
    app::run(&config)
}
