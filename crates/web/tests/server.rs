use std::net::SocketAddr;
use std::sync::Arc;

use http::StatusCode;
use miniboot_http::handler::{HandlerError, handler_fn};
use miniboot_http::protocol::{Request, Response};
use miniboot_web::builtin::{echo, health, ping};
use miniboot_web::middleware::{MiddlewareChain, StaticTokenVerifier};
use miniboot_web::router::{get, post};
use miniboot_web::{RequestExt, Router, Server, ShutdownHandle};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

const TOKEN: &str = "test-token";

#[derive(Deserialize)]
struct NewCustomer {
    name: String,
}

async fn create_customer(req: Request) -> Result<Response, HandlerError> {
    let customer: NewCustomer = serde_json::from_slice(req.body())?;
    Response::json(StatusCode::CREATED, &json!({ "name": customer.name }))
}

async fn patient(req: Request) -> Result<Response, HandlerError> {
    let id: u64 = req.query().get("id").ok_or_else(|| HandlerError::bad_request("missing id"))?.parse()?;
    Response::json(StatusCode::OK, &json!({ "id": id }))
}

async fn doctor(req: Request) -> Result<Response, HandlerError> {
    Response::json(StatusCode::OK, req.path_params())
}

struct TestServer {
    address: SocketAddr,
    shutdown: ShutdownHandle,
    serving: JoinHandle<()>,
}

impl TestServer {
    async fn start() -> Self {
        let router = Router::builder()
            .route("/health", get(handler_fn(health)))
            .route("/ping", get(handler_fn(ping)))
            .route("/echo", get(handler_fn(echo)))
            .route("/echo", post(handler_fn(echo)))
            .route("/customers/createNewCustomer", post(handler_fn(create_customer)))
            .route("/patients", get(handler_fn(patient)))
            .route("/doctors/{id}", get(handler_fn(doctor)).protected())
            .middleware(MiddlewareChain::standard(Arc::new(StaticTokenVerifier::new([TOKEN]))))
            .build();

        let server = Server::builder().router(router).address("127.0.0.1:0").build().unwrap();
        let listener = server.bind().await.unwrap();
        let address = listener.local_addr().unwrap();
        let shutdown = server.shutdown_handle();
        let serving = tokio::spawn(async move { server.serve(listener).await });

        Self { address, shutdown, serving }
    }

    async fn send(&self, raw: &str) -> RawResponse {
        let mut stream = TcpStream::connect(self.address).await.unwrap();
        stream.write_all(raw.as_bytes()).await.unwrap();

        let mut output = Vec::new();
        stream.read_to_end(&mut output).await.unwrap();
        RawResponse::parse(&output)
    }

    async fn stop(self) {
        self.shutdown.stop();
        self.serving.await.unwrap();
    }
}

struct RawResponse {
    status: u16,
    head: String,
    body: Vec<u8>,
}

impl RawResponse {
    fn parse(output: &[u8]) -> Self {
        let split = output.windows(4).position(|window| window == b"\r\n\r\n").expect("response has no header terminator");
        let head = String::from_utf8(output[..split].to_vec()).unwrap();
        let body = output[split + 4..].to_vec();
        let status = head.split(' ').nth(1).unwrap().parse().unwrap();
        Self { status, head, body }
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.eq_ignore_ascii_case(name).then(|| value.trim())
        })
    }

    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    fn text(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap()
    }
}

fn post_request(path: &str, content_type: &str, body: &str) -> String {
    format!("POST {path} HTTP/1.1\r\nHost: test\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\n\r\n{body}", body.len())
}

#[tokio::test]
async fn health_is_ok() {
    let server = TestServer::start().await;

    let response = server.send("GET /health HTTP/1.1\r\nHost: test\r\n\r\n").await;

    assert_eq!(response.status, 200);
    assert!(response.text().contains(r#""status":"ok""#));
    assert_eq!(response.header("server"), Some("mini-boot"));
    assert_eq!(response.header("connection"), Some("close"));
    assert_eq!(response.header("access-control-allow-origin"), Some("*"));
    assert_eq!(response.header("access-control-allow-headers"), Some("Authorization,Content-Type"));
    assert_eq!(response.header("content-length"), Some(response.body.len().to_string().as_str()));
    assert!(response.header("date").unwrap().ends_with("GMT"));

    server.stop().await;
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let server = TestServer::start().await;

    let response = server.send(&post_request("/customers/createNewCustomer", "application/json", "{\"name\":")).await;

    assert_eq!(response.status, 400);
    assert_eq!(response.header("content-type"), Some("application/json"));
    assert_eq!(response.json()["error"], "Bad Request");

    let response = server.send(&post_request("/customers/createNewCustomer", "application/json", r#"{"name":"Ada"}"#)).await;
    assert_eq!(response.status, 201);
    assert_eq!(response.json(), json!({"name": "Ada"}));

    server.stop().await;
}

#[tokio::test]
async fn non_numeric_query_is_bad_request() {
    let server = TestServer::start().await;

    assert_eq!(server.send("GET /patients?id=abc HTTP/1.1\r\n\r\n").await.status, 400);

    let response = server.send("GET /patients?id=42 HTTP/1.1\r\n\r\n").await;
    assert_eq!(response.status, 200);
    assert_eq!(response.json(), json!({"id": 42}));

    server.stop().await;
}

#[tokio::test]
async fn wrong_method_is_405_and_unknown_path_is_404() {
    let server = TestServer::start().await;

    let response = server.send("DELETE /echo HTTP/1.1\r\n\r\n").await;
    assert_eq!(response.status, 405);
    assert_eq!(response.json()["error"], "Method Not Allowed");

    let response = server.send("GET /does-not-exist HTTP/1.1\r\n\r\n").await;
    assert_eq!(response.status, 404);
    assert_eq!(response.json()["error"], "Not Found");

    server.stop().await;
}

#[tokio::test]
async fn protected_route_needs_token() {
    let server = TestServer::start().await;

    let response = server.send("GET /doctors/7 HTTP/1.1\r\n\r\n").await;
    assert_eq!(response.status, 401);
    assert_eq!(response.json(), json!({"error": "missing Authorization"}));

    let response = server.send("GET /doctors/7 HTTP/1.1\r\nAuthorization: Bearer wrong\r\n\r\n").await;
    assert_eq!(response.status, 401);
    assert_eq!(response.json(), json!({"error": "invalid token"}));

    let response = server.send(&format!("GET /doctors/7 HTTP/1.1\r\nAuthorization: Bearer {TOKEN}\r\n\r\n")).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.json(), json!({"id": "7"}));

    server.stop().await;
}

#[tokio::test]
async fn framing_errors_are_bad_request() {
    let server = TestServer::start().await;

    let chunked = "POST /echo HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n";
    let response = server.send(chunked).await;
    assert_eq!(response.status, 400);
    assert_eq!(response.text(), "bad request");

    let response = server.send("POST /echo HTTP/1.1\r\nContent-Length: 1000001\r\n\r\n").await;
    assert_eq!(response.status, 400);

    let response = server.send("GARBAGE\r\n\r\n").await;
    assert_eq!(response.status, 400);

    server.stop().await;
}

#[tokio::test]
async fn same_request_twice_is_idempotent() {
    let server = TestServer::start().await;

    let first = server.send("GET /ping HTTP/1.1\r\n\r\n").await;
    let second = server.send("GET /ping HTTP/1.1\r\n\r\n").await;

    assert_eq!(first.status, second.status);
    assert_eq!(first.body, second.body);
    assert_eq!(first.text(), "pong");

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_connections_do_not_cross_talk() {
    let server = Arc::new(TestServer::start().await);

    let mut tasks = Vec::new();
    for i in 0..32 {
        let server = Arc::clone(&server);
        tasks.push(tokio::spawn(async move {
            let token = format!("token-{i}-{}", i * 7919);
            let response = server.send(&post_request("/echo", "text/plain", &token)).await;
            (token, response)
        }));
    }

    for task in tasks {
        let (token, response) = task.await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.text(), token);
        assert_eq!(response.header("content-type"), Some("text/plain"));
    }

    let Ok(server) = Arc::try_unwrap(server) else {
        panic!("server still shared");
    };
    server.stop().await;
}
