//! Core HTTP protocol types.
//!
//! - [`Request`]: a decoded, fully buffered request with its [`QueryParams`]
//! - [`Response`]: status, content type, headers and body of an answer
//! - [`HttpError`], [`ParseError`], [`SendError`]: failures of the connection,
//!   the decoder and the encoder
//!
//! These types are used by the codec and connection layers and are what
//! handlers and middleware consume and produce.

mod request;
pub use request::QueryParams;
pub use request::Request;
pub use request::RequestBuilder;
pub use request::normalize_path;

mod response;
pub use response::DEFAULT_CONTENT_TYPE;
pub use response::DEFAULT_SERVER_NAME;
pub use response::JSON_CONTENT_TYPE;
pub use response::Response;
pub use response::reason_phrase;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
