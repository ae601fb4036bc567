//! # WebQQ Client
//!
//! A session-oriented client for the cookie-authenticated, long-polling
//! WebQQ chat API.
//!
//! The client performs the browser-emulating QR login handshake, keeps the
//! acquired token set in an immutable [`Session`](session::Session)
//! snapshot, and runs one background task that long-polls the message
//! channel and dispatches inbound events to an
//! [`EventListener`](events::EventListener), in server order.
//!
//! HTTP is abstracted behind the [`HttpTransport`](http::HttpTransport)
//! trait; [`ReqwestTransport`](http::ReqwestTransport) is the production
//! implementation with the cookie jar the handshake depends on.

pub mod api;
pub mod client;
pub mod error;
pub mod events;
pub mod http;
pub mod session;

mod login;

pub use client::{LoginOutcome, WebQqClient};

/// Default timeout for ordinary HTTP requests (seconds).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Timeout for the long-poll request, which the server deliberately holds
/// open until an event arrives (seconds).
pub const POLL_TIMEOUT_SECS: u64 = 180;

/// Timeout for the QR challenge image fetch (seconds).
pub const QR_FETCH_TIMEOUT_SECS: u64 = 10;

/// Interval between QR confirmation polls (seconds).
pub const QR_POLL_INTERVAL_SECS: u64 = 1;

/// Pause before the next poll round after a failed one (seconds).
pub const POLL_RETRY_PAUSE_SECS: u64 = 1;

/// Total attempts for a message send whose HTTP status is not 200.
pub const SEND_ATTEMPTS: u32 = 5;

/// Browser user agent presented on every request.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 6.1; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/49.0.2623.110 Safari/537.36";
