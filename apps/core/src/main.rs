use clap::Parser;

use sundar_core::backend;
use sundar_core::config;
use sundar_core::logging;
use sundar_core::runtime::{self, CliOptions};

fn main() {
    dotenvy::dotenv().ok();
    let options = CliOptions::parse();

    if let Err(error) = logging::init(options.log_level) {
        eprintln!("[sundar] file logging unavailable: {error}");
    }

    let config = match runtime::load_config(&options) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("[sundar] {error}");
            std::process::exit(1);
        }
    };

    if options.print_config {
        match config::to_toml(&config) {
            Ok(encoded) => {
                print!("{encoded}");
                return;
            }
            Err(error) => {
                eprintln!("[sundar] {error}");
                std::process::exit(1);
            }
        }
    }

    let api_key = match backend::load_api_key(&config.api_key_env) {
        Ok(key) => key,
        Err(error) => {
            eprintln!("[sundar] {error}");
            std::process::exit(2);
        }
    };

    if let Err(error) = runtime::run(config, api_key) {
        log::error!("runtime failed: {error}");
        eprintln!("[sundar] runtime failed: {error}");
        std::process::exit(1);
    }
}
