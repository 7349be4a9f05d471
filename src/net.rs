//! The single-threaded `mio::Poll` reactor.
//!
//! One `Poll` instance multiplexes the listening socket and every client
//! socket. Each iteration waits on readiness, dispatches accept/read/write,
//! then re-evaluates every client's interest mask before looping (see
//! `§4.1` in DESIGN.md's grounding notes).

use std::collections::HashMap;
use std::io::{ErrorKind, Read, Write};
use std::net::SocketAddr;
use std::time::Duration;

use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token};

use crate::config::Config;
use crate::error::Error;
use crate::state::State;
use crate::ShutdownHandle;

const LISTENER: Token = Token(0);
const READ_CHUNK: usize = 512;
const POLL_TIMEOUT: Duration = Duration::from_millis(500);

/// The bound, running server. Owns the reactor and the name-space registry.
pub struct Server {
    poll: Poll,
    listener: TcpListener,
    sockets: HashMap<Token, TcpStream>,
    state: State,
    shutdown: ShutdownHandle,
    next_token: usize,
}

impl Server {
    /// Binds the configured port and runs the reactor loop until `shutdown`
    /// is observed. Blocks the calling thread for the lifetime of the
    /// server.
    pub fn start(port: u16, password: String, config: Config, shutdown: ShutdownHandle) -> Result<(), Error> {
        let mut server = Server::bind(port, password, config, shutdown)?;
        server.run()
    }

    fn bind(port: u16, password: String, config: Config, shutdown: ShutdownHandle) -> Result<Server, Error> {
        let addr: SocketAddr = ([0, 0, 0, 0], port).into();
        let mut listener = TcpListener::bind(addr).map_err(|source| Error::Bind { port, source })?;
        let poll = Poll::new().map_err(Error::Poll)?;
        poll.registry().register(&mut listener, LISTENER, Interest::READABLE).map_err(Error::Poll)?;
        log::info!("Server listening on port {}", port);

        Ok(Server {
            poll,
            listener,
            sockets: HashMap::new(),
            state: State::new(config, password),
            shutdown,
            next_token: 1,
        })
    }

    fn run(&mut self) -> Result<(), Error> {
        let mut events = Events::with_capacity(1024);

        while !self.shutdown.is_stopped() {
            match self.poll.poll(&mut events, Some(POLL_TIMEOUT)) {
                Ok(()) => {}
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::error!("poll error: {}", e);
                    return Err(Error::Poll(e));
                }
            }

            for event in events.iter() {
                let token = event.token();
                if token == LISTENER {
                    self.accept_all();
                    continue;
                }
                if !self.sockets.contains_key(&token) {
                    continue;
                }
                if event.is_error() || event.is_read_closed() {
                    self.close_client(token);
                    continue;
                }
                if event.is_readable() {
                    self.readable(token);
                }
                if self.sockets.contains_key(&token) && event.is_writable() {
                    self.writable(token);
                }
            }

            self.sync_interests();
            self.reap();
        }

        log::info!("shutting down");
        Ok(())
    }

    fn accept_all(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((mut stream, addr)) => {
                    let token = Token(self.next_token);
                    self.next_token += 1;
                    if let Err(e) = self.poll.registry().register(&mut stream, token, Interest::READABLE) {
                        log::warn!("failed to register client socket: {}", e);
                        continue;
                    }
                    self.state.add_client(token, addr.ip().to_string());
                    log::debug!("client connected from {}", addr);
                    self.sockets.insert(token, stream);
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::warn!("accept error: {}", e);
                    break;
                }
            }
        }
    }

    fn readable(&mut self, token: Token) {
        let mut buf = [0u8; READ_CHUNK];
        loop {
            let Some(stream) = self.sockets.get_mut(&token) else { return };
            match stream.read(&mut buf) {
                Ok(0) => {
                    self.close_client(token);
                    return;
                }
                Ok(n) => self.state.feed(token, &buf[..n]),
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => return,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::debug!("read error on client: {}", e);
                    self.close_client(token);
                    return;
                }
            }
        }
    }

    fn writable(&mut self, token: Token) {
        let pending = self.state.take_output(token);
        if pending.is_empty() {
            return;
        }
        let Some(stream) = self.sockets.get_mut(&token) else { return };
        match stream.write(pending.as_bytes()) {
            Ok(n) if n >= pending.len() => {}
            Ok(n) => self.state.requeue_output(token, &pending[n..]),
            Err(ref e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::Interrupted => {
                self.state.requeue_output(token, &pending);
            }
            Err(e) => {
                log::debug!("write error on client: {}", e);
                self.close_client(token);
            }
        }
    }

    /// A permanent I/O failure: runs the full QUIT cascade with reason
    /// `"Client disconnected"` and drops the record.
    fn close_client(&mut self, token: Token) {
        self.deregister(token);
        self.state.disconnect(token);
        log::debug!("client disconnected");
    }

    /// Tears down a client whose cascade already ran (an explicit QUIT)
    /// once its goodbye line has drained.
    fn remove_client(&mut self, token: Token) {
        self.deregister(token);
        self.state.drop_client(token);
    }

    fn deregister(&mut self, token: Token) {
        if let Some(mut stream) = self.sockets.remove(&token) {
            let _ = self.poll.registry().deregister(&mut stream);
        }
    }

    /// Promotes a client's interest to include writable the moment it has
    /// queued output, and demotes it back to readable-only once drained.
    fn sync_interests(&mut self) {
        for (token, stream) in self.sockets.iter_mut() {
            let interest =
                if self.state.has_data_to_send(*token) { Interest::READABLE | Interest::WRITABLE } else { Interest::READABLE };
            if let Err(e) = self.poll.registry().reregister(stream, *token, interest) {
                log::warn!("failed to reregister client: {}", e);
            }
        }
    }

    /// Removes every client marked for removal whose queued output (if
    /// any, such as a QUIT goodbye line) has fully drained.
    fn reap(&mut self) {
        let ready: Vec<Token> = self
            .sockets
            .keys()
            .copied()
            .filter(|&t| self.state.is_marked_for_removal(t) && !self.state.has_data_to_send(t))
            .collect();
        for token in ready {
            self.remove_client(token);
        }
    }
}
