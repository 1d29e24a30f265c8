//! Entry point: parses CLI flags, initializes logging, bootstraps the
//! daemon, and runs until SIGINT.

use std::sync::Arc;

use log::error;

use ls_router::daemon::Daemon;
use ls_router::{cli, Result};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = cli::parse(std::env::args().skip(1))?;
    let daemon = Daemon::bootstrap(args.port)?;
    install_shutdown_handler(Arc::clone(&daemon));
    daemon.run();
    Ok(())
}

fn install_shutdown_handler(daemon: Arc<Daemon>) {
    ctrlc::set_handler(move || {
        log::info!("received shutdown signal, stopping {}", daemon.router_id());
        daemon.stop();
    })
    .expect("failed to install SIGINT handler");
}
