//! Connection acceptor
//!
//! The [`Server`] owns the listening socket. Each accepted connection becomes
//! a task that waits for one of `max_workers` slots and then runs a single
//! request/response exchange through the [`Router`].

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use http::HeaderValue;
use miniboot_http::connection::HttpConnection;
use thiserror::Error;
use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use crate::config::ServerConfig;
use crate::router::Router;

const LISTEN_BACKLOG: u32 = 1024;

pub struct ServerBuilder {
    router: Option<Router>,
    address: Option<Result<SocketAddr, String>>,
    server_name: Option<String>,
    config: ServerConfig,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { router: None, address: None, server_name: None, config: ServerConfig::default() }
    }

    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    /// The address to listen on. The first resolved address is used.
    pub fn address<A: ToSocketAddrs>(mut self, address: A) -> Self {
        let resolved = match address.to_socket_addrs() {
            Ok(mut addresses) => addresses.next().ok_or_else(|| "address resolved to nothing".to_string()),
            Err(e) => Err(e.to_string()),
        };
        self.address = Some(resolved);
        self
    }

    /// Replaces every setting at once. Later calls to the single-value setters still apply.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_body_size(mut self, max_body_size: usize) -> Self {
        self.config.max_body_size = max_body_size;
        self
    }

    pub fn read_timeout(mut self, read_timeout: Duration) -> Self {
        self.config.read_timeout = read_timeout;
        self
    }

    pub fn max_workers(mut self, max_workers: usize) -> Self {
        self.config.max_workers = max_workers;
        self
    }

    pub fn shutdown_grace(mut self, shutdown_grace: Duration) -> Self {
        self.config.shutdown_grace = shutdown_grace;
        self
    }

    pub fn server_name(mut self, server_name: impl Into<String>) -> Self {
        self.server_name = Some(server_name.into());
        self
    }

    pub fn log_level(mut self, log_level: Level) -> Self {
        self.config.log_level = log_level;
        self
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        let router = self.router.ok_or(ServerBuildError::MissingRouter)?;
        let mut config = self.config;

        if let Some(address) = self.address {
            config.address = address.map_err(|reason| ServerBuildError::InvalidAddress { reason })?;
        }
        if let Some(name) = self.server_name {
            config.server_name = HeaderValue::from_str(&name).map_err(|_| ServerBuildError::InvalidServerName { name })?;
        }
        if config.max_workers == 0 {
            return Err(ServerBuildError::NoWorkers);
        }

        Ok(Server { router: Arc::new(router), config, shutdown: ShutdownHandle::new() })
    }
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder").field("address", &self.address).field("config", &self.config).finish_non_exhaustive()
    }
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("router must be set")]
    MissingRouter,
    #[error("invalid address: {reason}")]
    InvalidAddress { reason: String },
    #[error("server name {name:?} is not a valid header value")]
    InvalidServerName { name: String },
    #[error("max_workers must be at least 1")]
    NoWorkers,
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("can't listen on {address}: {source}")]
    Bind { address: SocketAddr, source: io::Error },
}

/// Stops a running [`Server`] from any task. Clones stop the same server.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self { shutdown_tx: Arc::new(shutdown_tx) }
    }

    /// Requests the server to stop. Returns `false` if a stop was already requested.
    pub fn stop(&self) -> bool {
        !self.shutdown_tx.send_replace(true)
    }

    pub fn is_stopped(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }
}

pub struct Server {
    router: Arc<Router>,
    config: ServerConfig,
    shutdown: ShutdownHandle,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server").field("router", &self.router).field("config", &self.config).finish_non_exhaustive()
    }
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// See [`ShutdownHandle::stop`].
    pub fn stop(&self) -> bool {
        self.shutdown.stop()
    }

    /// Installs the log subscriber, binds the configured address and serves until stopped.
    pub async fn start(&self) -> Result<(), ServerError> {
        init_tracing(self.config.log_level);

        let listener = self.bind().await?;
        info!(address = %self.config.address, middleware = ?self.router.middleware_names(), "start listening");
        self.serve(listener).await;
        Ok(())
    }

    /// Binds the configured address with `SO_REUSEADDR` set.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let address = self.config.address;
        let bind = || -> io::Result<TcpListener> {
            let socket = if address.is_ipv4() { TcpSocket::new_v4()? } else { TcpSocket::new_v6()? };
            socket.set_reuseaddr(true)?;
            socket.bind(address)?;
            socket.listen(LISTEN_BACKLOG)
        };
        bind().map_err(|source| ServerError::Bind { address, source })
    }

    /// Accepts connections on `listener` until [`stop`](Self::stop) is called.
    ///
    /// Once stopped, the listener is closed, in-flight connections get
    /// `shutdown_grace` to finish and the rest are aborted.
    pub async fn serve(&self, listener: TcpListener) {
        let workers_limit = Arc::new(Semaphore::new(self.config.max_workers));
        let connection_config = self.config.connection_config();
        let mut shutdown_rx = self.shutdown.subscribe();
        let mut workers = JoinSet::new();

        while !self.shutdown.is_stopped() {
            tokio::select! {
                biased;

                // the sender lives as long as `self`, so only a stop can wake this
                _ = shutdown_rx.changed() => break,

                // reap before accepting so finished tasks never pile up
                Some(finished) = workers.join_next(), if !workers.is_empty() => {
                    if let Err(e) = finished {
                        error!(cause = %e, "connection task failed");
                    }
                }

                accepted = listener.accept() => {
                    let (tcp_stream, remote_addr) = match accepted {
                        Ok(stream_and_addr) => stream_and_addr,
                        Err(e) => {
                            warn!(cause = %e, "failed to accept");
                            continue;
                        }
                    };

                    let router = Arc::clone(&self.router);
                    let workers_limit = Arc::clone(&workers_limit);
                    let connection_config = connection_config.clone();

                    workers.spawn(async move {
                        let Ok(_permit) = workers_limit.acquire_owned().await else {
                            return;
                        };

                        let (reader, writer) = tcp_stream.into_split();
                        let connection = HttpConnection::new(reader, writer, &connection_config);
                        match connection.process(router).await {
                            Ok(()) => debug!(%remote_addr, "finished process, connection shutdown"),
                            Err(e) => info!(%remote_addr, cause = %e, "connection shutdown with error"),
                        }
                    });
                }
            }
        }

        drop(listener);
        info!(in_flight = workers.len(), "stop accepting, draining connections");

        let drain = async {
            while workers.join_next().await.is_some() {}
        };
        if tokio::time::timeout(self.config.shutdown_grace, drain).await.is_err() {
            warn!(remaining = workers.len(), "grace period elapsed, aborting connections");
            workers.abort_all();
            while workers.join_next().await.is_some() {}
        }
        info!("server stopped");
    }
}

/// Installs the fmt subscriber unless a global subscriber already exists.
fn init_tracing(level: Level) {
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        debug!("global tracing subscriber already set");
    }
}
