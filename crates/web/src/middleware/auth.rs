use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use http::StatusCode;
use http::header::AUTHORIZATION;
use miniboot_http::handler::{BoxHandler, Handler, HandlerError};
use miniboot_http::protocol::{Request, Response};
use thiserror::Error;
use tracing::warn;

use crate::middleware::Middleware;
use crate::router::RequestExt;

const MISSING_AUTHORIZATION: &str = r#"{"error":"missing Authorization"}"#;
const INVALID_TOKEN: &str = r#"{"error":"invalid token"}"#;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("unsupported authorization scheme")]
    UnsupportedScheme,

    #[error("token is not valid")]
    InvalidToken,
}

/// Validates the raw value of an `Authorization` header.
#[cfg_attr(test, mockall::automock)]
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, authorization: &str) -> Result<(), TokenError>;
}

/// Accepts `Bearer <token>` for a fixed set of tokens.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashSet<String>,
}

impl StaticTokenVerifier {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { tokens: tokens.into_iter().map(Into::into).filter(|token: &String| !token.is_empty()).collect() }
    }
}

impl TokenVerifier for StaticTokenVerifier {
    fn verify(&self, authorization: &str) -> Result<(), TokenError> {
        let authorization = authorization.trim();
        let (scheme, token) = authorization.split_once(' ').unwrap_or((authorization, ""));
        if !scheme.eq_ignore_ascii_case("bearer") {
            return Err(TokenError::UnsupportedScheme);
        }

        if self.tokens.contains(token.trim()) { Ok(()) } else { Err(TokenError::InvalidToken) }
    }
}

/// Guards routes registered as protected.
///
/// Unprotected requests pass straight through. A protected request needs a
/// non-empty `Authorization` header that the [`TokenVerifier`] accepts,
/// otherwise it is answered with `401` and a JSON error body.
#[derive(Clone)]
pub struct Auth {
    verifier: Arc<dyn TokenVerifier>,
}

impl Auth {
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { verifier }
    }
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auth").finish_non_exhaustive()
    }
}

impl Middleware for Auth {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn decorate(&self, next: BoxHandler) -> BoxHandler {
        Arc::new(AuthHandler { verifier: Arc::clone(&self.verifier), next })
    }
}

struct AuthHandler {
    verifier: Arc<dyn TokenVerifier>,
    next: BoxHandler,
}

#[async_trait]
impl Handler for AuthHandler {
    async fn call(&self, req: Request) -> Result<Response, HandlerError> {
        if !req.is_protected() {
            return self.next.call(req).await;
        }

        let authorization = req.headers().get(AUTHORIZATION).map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());
        let Some(authorization) = authorization.filter(|value| !value.is_empty()) else {
            warn!(path = req.path(), "protected route called without authorization");
            return Ok(Response::json_bytes(StatusCode::UNAUTHORIZED, MISSING_AUTHORIZATION));
        };

        match self.verifier.verify(&authorization) {
            Ok(()) => self.next.call(req).await,
            Err(e) => {
                warn!(path = req.path(), cause = %e, "authorization rejected");
                Ok(Response::json_bytes(StatusCode::UNAUTHORIZED, INVALID_TOKEN))
            }
        }
    }
}
