//! A small, single-threaded IRC relay server.
//!
//! The public surface is deliberately thin: [`Server::start`] binds and
//! runs the reactor until a [`ShutdownHandle`] requests a stop. Argument
//! parsing, signal installation and logging backend selection live in the
//! binary (`main.rs`), not here.

pub mod channel;
pub mod client;
pub mod config;
pub mod error;
pub mod lines;
pub mod modes;
mod net;
pub mod state;

pub use config::Config;
pub use error::Error;
pub use net::Server;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cloneable flag that requests the reactor stop after its current
/// iteration. The launcher holds one, clones it into its signal handler,
/// and passes the original into [`Server::start`].
#[derive(Clone, Default)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    pub fn new() -> ShutdownHandle {
        ShutdownHandle(Arc::new(AtomicBool::new(false)))
    }

    /// Requests a stop. Safe to call from a signal handler: a single
    /// relaxed atomic store, nothing else.
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Exposes the underlying flag so the launcher can hand it straight to
    /// `signal_hook::flag::register`, which requires its own `Arc<AtomicBool>`
    /// rather than a handler callback.
    pub fn as_atomic(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}
