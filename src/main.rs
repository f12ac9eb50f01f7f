use std::{env, process::exit};

use ardis::config::Config;
use ardis::{server, util};
use tracing::warn;

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    let mut config = Config::default();
    let mut have_config_file = false;

    if args.len() == 2 {
        config.load_from_file(&args[1]);
        have_config_file = true;
    } else if args.len() > 2 {
        eprintln!("Usage: ./ardis [/path/to/ardis.conf]");
        exit(1);
    }

    util::init_logging(&config.log_level);
    if !have_config_file {
        warn!("no config file specified, using the default config");
    }
    server::run(config).await;
}
