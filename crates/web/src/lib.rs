//! Routing, middleware and the connection acceptor of mini-boot.
//!
//! This crate sits on top of `miniboot-http`. A [`Router`] maps method and
//! path to a handler, a [`middleware::MiddlewareChain`] wraps every handler
//! with cross-cutting behavior, and a [`Server`] accepts TCP connections and
//! drives each one through the router.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use miniboot_http::handler::handler_fn;
//! use miniboot_web::builtin::{echo, health, ping};
//! use miniboot_web::middleware::{MiddlewareChain, StaticTokenVerifier};
//! use miniboot_web::router::{get, post};
//! use miniboot_web::{Router, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let chain = MiddlewareChain::standard(Arc::new(StaticTokenVerifier::new(["secret"])));
//!     let router = Router::builder()
//!         .route("/health", get(handler_fn(health)))
//!         .route("/ping", get(handler_fn(ping)))
//!         .route("/echo", post(handler_fn(echo)).protected())
//!         .middleware(chain)
//!         .build();
//!
//!     let server = Server::builder().router(router).address("127.0.0.1:8080").build().unwrap();
//!     server.start().await.unwrap();
//! }
//! ```

pub mod builtin;
pub mod middleware;
pub mod router;

mod config;
mod server;

pub use config::ServerConfig;
pub use config::default_workers;
pub use router::PathParams;
pub use router::RequestExt;
pub use router::Router;
pub use server::Server;
pub use server::ServerBuildError;
pub use server::ServerBuilder;
pub use server::ServerError;
pub use server::ShutdownHandle;
