//! Stand-alone mini-boot server with the diagnostic routes mounted.

use std::net::IpAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use http::StatusCode;
use miniboot_http::handler::{HandlerError, handler_fn};
use miniboot_http::protocol::{Request, Response};
use miniboot_web::builtin::{echo, health, ping};
use miniboot_web::middleware::{MiddlewareChain, StaticTokenVerifier};
use miniboot_web::router::{get, post};
use miniboot_web::{RequestExt, Router, Server};
use serde_json::json;
use tracing::{Level, error, info};

#[derive(Debug, Parser)]
#[command(name = "miniboot-server", version, about = "Minimal HTTP/1.1 server")]
struct Cli {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Largest accepted request body in bytes
    #[arg(long, env = "MAX_BODY_BYTES", default_value_t = 1_000_000)]
    max_body_bytes: usize,

    /// Connections handled concurrently [default: max(4, 2 x CPUs)]
    #[arg(long, env = "WORKER_THREADS")]
    worker_threads: Option<usize>,

    #[arg(long, env = "READ_TIMEOUT_SECS", default_value_t = 10)]
    read_timeout_secs: u64,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: Level,

    /// Bearer tokens accepted on protected routes, comma separated
    #[arg(long, env = "AUTH_TOKEN", value_delimiter = ',')]
    auth_token: Vec<String>,
}

async fn doctor(req: Request) -> Result<Response, HandlerError> {
    let id = req.path_param("id").ok_or_else(|| HandlerError::bad_request("missing id"))?;
    Response::json(StatusCode::OK, &json!({ "id": id }))
}

fn router(tokens: Vec<String>) -> Router {
    let chain = MiddlewareChain::standard(Arc::new(StaticTokenVerifier::new(tokens)));

    Router::builder()
        .route("/health", get(handler_fn(health)))
        .route("/ping", get(handler_fn(ping)))
        .route("/echo", get(handler_fn(echo)))
        .route("/echo", post(handler_fn(echo)))
        .route("/doctors/{id}", get(handler_fn(doctor)).protected())
        .middleware(chain)
        .build()
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut builder = Server::builder()
        .router(router(cli.auth_token))
        .address((cli.host, cli.port))
        .max_body_size(cli.max_body_bytes)
        .read_timeout(Duration::from_secs(cli.read_timeout_secs))
        .log_level(cli.log_level);
    if let Some(workers) = cli.worker_threads {
        builder = builder.max_workers(workers);
    }

    let server = match builder.build() {
        Ok(server) => server,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, stopping");
            shutdown.stop();
        }
    });

    match server.start().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(cause = %e, "server failed");
            ExitCode::FAILURE
        }
    }
}
