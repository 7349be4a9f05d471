//! Thin external launcher: argument parsing, logging backend, signal
//! installation. None of this lives in the library; it is exactly the
//! "argument parsing and the process entry point" and "signal installation"
//! the core treats as an external collaborator's job.

use std::process::ExitCode;

use clap::Parser;
use ircd::{Config, ShutdownHandle};

#[derive(Parser)]
#[command(name = "ircd", about = "A small, single-threaded IRC relay server")]
struct Args {
    /// TCP port to listen on.
    port: u16,
    /// Shared password clients must supply via PASS before registering.
    password: String,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let shutdown = ShutdownHandle::new();
    if let Err(e) = signal_hook::flag::register(signal_hook::consts::SIGINT, shutdown.as_atomic()) {
        log::warn!("failed to install SIGINT handler: {}", e);
    }
    if let Err(e) = signal_hook::flag::register(signal_hook::consts::SIGTERM, shutdown.as_atomic()) {
        log::warn!("failed to install SIGTERM handler: {}", e);
    }

    match ircd::Server::start(args.port, args.password, Config::default(), shutdown) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
