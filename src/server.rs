//! Server orchestration: builds the configuration, starts the directory
//! actor, then accepts connections and spawns one task per socket. Mirrors
//! the teacher's `server_read()/server_write()` boot sequence in spirit —
//! config first, banner second, accept loop last — minus the daemonize/RDB
//! machinery a single-process actor store has no use for.

use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::Config;
use crate::connection;
use crate::directory;

const VERSION: &str = "0.1.0";

pub async fn run(config: Config) {
    print_logo(&config);

    let directory = directory::spawn(&config);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%addr, error = %e, "could not bind listener");
            std::process::exit(1);
        }
    };
    info!(%addr, "ready to accept connections");

    loop {
        match listener.accept().await {
            Ok((socket, peer)) => {
                let directory = directory.clone();
                tokio::spawn(async move {
                    connection::handle(socket, peer, directory).await;
                });
            }
            Err(e) => {
                error!(error = %e, "accept failed");
            }
        }
    }
}

pub fn print_logo(config: &Config) {
    info!("                _._                                                  ");
    info!("           _.-``__ ''-._                                             ");
    info!("      _.-``    `.  `_.  ''-._           ardis {}", VERSION);
    info!("  .-`` .-```.  ```\\/    _.,_ ''-._                                   ");
    info!(" (    '      ,       .-`  | `,    )     actor-per-key store");
    info!(" |`-._`-...-` __...-.``-._|'` _.-'|     Port: {}", config.port);
    info!("  `-._    `-._  `-./  _.-'    _.-'                                   ");
    info!(" |`-._`-._    `-.__.-'    _.-'_.-'|                                  ");
    info!("  `-._    `-._`-.__.-'_.-'    _.-'                                   ");
    info!("      `-._    `-.__.-'    _.-'                                       ");
    info!("          `-._        _.-'                                           ");
    info!("              `-.__.-'                                               ");
}
