//! # WebQQ Core
//!
//! Protocol-level vocabulary for the WebQQ long-poll chat API: the response
//! envelope and its validation rules, the request signing hash, presence
//! status codes, rich-text message content, and the domain records exchanged
//! with the query endpoints.
//!
//! Everything here is transport-agnostic; the HTTP client lives in
//! `webqq_client`.

pub mod content;
pub mod envelope;
pub mod error;
pub mod hash;
pub mod message;
pub mod models;
pub mod status;

/// Fixed client instance id embedded in every channel payload.
pub const CLIENT_ID: i64 = 53_999_199;

/// Seed for the outbound message sequence counter. The server only
/// deduplicates ids within a live session, so a fresh counter per process
/// is sufficient.
pub const MESSAGE_SEQ_SEED: i64 = 43_690_001;

/// Decorative face id attached to every outbound message.
pub const DEFAULT_FACE: i64 = 573;

/// Return code the server uses to signal a desynchronized session.
pub const RETCODE_SESSION_DESYNC: i64 = 103;
