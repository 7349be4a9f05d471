//! Setup-time failures.
//!
//! Per-command failures never reach here; they are numeric replies queued
//! on a [`ReplyBuffer`](ircd_tokens::ReplyBuffer). This enum is only for
//! the handful of things that can go wrong before the reactor has a chance
//! to run at all.

use std::fmt;
use std::io;

#[derive(Debug)]
pub enum Error {
    /// Binding or listening on the configured port failed.
    Bind { port: u16, source: io::Error },
    /// Registering the listener with the OS readiness primitive failed.
    Poll(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Bind { port, source } => {
                write!(f, "failed to bind/listen on port {}: {}", port, source)
            }
            Error::Poll(source) => write!(f, "failed to initialize the poll instance: {}", source),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Bind { source, .. } => Some(source),
            Error::Poll(source) => Some(source),
        }
    }
}
