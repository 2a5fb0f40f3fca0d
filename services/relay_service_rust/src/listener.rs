//! TCP ingestion listener
//!
//! One listener per message family. Each owns a single worker task that
//! accepts a connection, performs exactly one bounded read, and hands the
//! decoded frame to its [`FrameHandler`] before accepting the next
//! connection. Handlers are owned by the worker, so their state has a single
//! writer and needs no locking.
//!
//! Shutdown is raced only against `accept`; a frame that is already being
//! read or handled runs to completion first.

use async_trait::async_trait;
use log::{debug, error, info, warn};
use parking_lot::RwLock;
use relay_core::protocol::{self, Frame, MAX_FRAME_SIZE, PROBE_REPLY};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{RelayError, Result};

/// Back-off after a failed `accept` so a persistent error does not spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Consumer of decoded message frames.
#[async_trait]
pub trait FrameHandler: Send + 'static {
    async fn handle(&mut self, text: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Stopped,
    Listening,
    Stopping,
}

/// What happens to a connection after its frame was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPolicy {
    /// Drop the connection right away
    Close,
    /// Keep it open until the listener stops
    Retain,
}

#[derive(Debug, Clone)]
pub struct ListenerOptions {
    pub read_timeout: Option<Duration>,
    pub connection_policy: ConnectionPolicy,
}

impl Default for ListenerOptions {
    fn default() -> Self {
        Self {
            read_timeout: Some(Duration::from_secs(10)),
            connection_policy: ConnectionPolicy::Close,
        }
    }
}

/// Marks the listener `Stopped` when the worker exits, including by panic.
struct ExitGuard(Arc<RwLock<ListenerState>>);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        *self.0.write() = ListenerState::Stopped;
    }
}

struct Worker<H> {
    name: &'static str,
    state: Arc<RwLock<ListenerState>>,
    listener: TcpListener,
    handler: H,
    options: ListenerOptions,
    retained: Vec<TcpStream>,
}

impl<H: FrameHandler> Worker<H> {
    async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) -> Self {
        let _exit = ExitGuard(self.state.clone());

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer)) => self.serve(stream, peer).await,
                        Err(e) => {
                            error!("{} listener accept failed: {}", self.name, e);
                            tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                        }
                    }
                }
                // Err means the handle was dropped without stop()
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        info!("{} listener accept loop exiting", self.name);
        self
    }

    async fn serve(&mut self, mut stream: TcpStream, peer: SocketAddr) {
        let mut buf = [0u8; MAX_FRAME_SIZE];

        let read = match self.options.read_timeout {
            Some(limit) => match tokio::time::timeout(limit, stream.read(&mut buf)).await {
                Ok(r) => r,
                Err(_) => {
                    warn!("{} listener: no frame from {} within {:?}", self.name, peer, limit);
                    return;
                }
            },
            None => stream.read(&mut buf).await,
        };

        let n = match read {
            Ok(n) => n,
            Err(e) => {
                warn!("{} listener: read from {} failed: {}", self.name, peer, e);
                return;
            }
        };

        match protocol::classify(&buf[..n]) {
            Frame::Probe => {
                debug!("{} listener: liveness probe from {}", self.name, peer);
                if let Err(e) = stream.write_all(PROBE_REPLY.as_bytes()).await {
                    warn!("{} listener: probe reply to {} failed: {}", self.name, peer, e);
                }
            }
            Frame::Message(text) if text.is_empty() => {
                debug!("{} listener: empty frame from {}", self.name, peer);
            }
            Frame::Message(text) => {
                debug!("{} listener: frame from {}: {}", self.name, peer, text);
                self.handler.handle(&text).await;
            }
        }

        if self.options.connection_policy == ConnectionPolicy::Retain {
            self.retained.push(stream);
        }
    }
}

/// Handle to a running listener.
pub struct IngestionListener<H> {
    name: &'static str,
    local_addr: SocketAddr,
    state: Arc<RwLock<ListenerState>>,
    shutdown_tx: watch::Sender<bool>,
    worker: Option<JoinHandle<Worker<H>>>,
}

impl<H: FrameHandler> IngestionListener<H> {
    /// Bind and start accepting. A bind failure is returned once; there is no retry.
    pub async fn start(
        name: &'static str,
        bind_ip: IpAddr,
        port: u16,
        handler: H,
        options: ListenerOptions,
    ) -> Result<Self> {
        let addr = SocketAddr::new(bind_ip, port);
        let listener = TcpListener::bind(addr).await.map_err(|source| RelayError::Bind {
            listener: name,
            addr,
            source,
        })?;
        let local_addr = listener.local_addr()?;

        info!("{} listener started on {}", name, local_addr);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = Arc::new(RwLock::new(ListenerState::Listening));
        let worker = Worker {
            name,
            state: state.clone(),
            listener,
            handler,
            options,
            retained: Vec::new(),
        };

        Ok(Self {
            name,
            local_addr,
            state,
            shutdown_tx,
            worker: Some(tokio::spawn(worker.run(shutdown_rx))),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Reads `Stopped` once the worker has exited, whether through `stop` or
    /// because it failed.
    pub fn state(&self) -> ListenerState {
        *self.state.read()
    }

    /// Stop accepting, close the listening socket and every retained
    /// connection, and hand the frame handler back.
    pub async fn stop(&mut self) -> Result<H> {
        let worker = self.worker.take().ok_or(RelayError::NotRunning(self.name))?;

        *self.state.write() = ListenerState::Stopping;
        let _ = self.shutdown_tx.send(true);

        let result = worker.await;
        *self.state.write() = ListenerState::Stopped;

        let worker = result?;
        let retained = worker.retained.len();
        drop(worker.listener);
        drop(worker.retained);

        info!(
            "{} listener stopped ({} retained connections closed)",
            self.name, retained
        );
        Ok(worker.handler)
    }
}
