//! Response envelope validation.
//!
//! Every JSON call (raw byte downloads excepted) answers with a top-level
//! envelope `{"retcode": <code>, "result": <payload>}`. Send responses
//! additionally carry an `errCode` success indicator that takes precedence
//! over the return code.

use serde::Deserialize;
use serde_json::Value;

use crate::{error::ApiError, RETCODE_SESSION_DESYNC};

/// Reject any response whose raw HTTP status is not 200, before the body is
/// parsed.
///
/// # Errors
///
/// Returns [`ApiError::Status`] carrying the offending status.
pub fn check_status(status: u16) -> Result<(), ApiError> {
    if status == 200 {
        Ok(())
    } else {
        Err(ApiError::Status(status))
    }
}

/// Check the status, parse the envelope and unwrap its `result` payload in
/// one step.
///
/// # Errors
///
/// Any of the [`check_status`], [`Envelope::parse`] and
/// [`Envelope::into_result`] failures.
pub fn validate(status: u16, body: &[u8]) -> Result<Value, ApiError> {
    check_status(status)?;
    Envelope::parse(body)?.into_result()
}

/// The top-level response wrapper.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    /// Numeric return code; `0` means success.
    #[serde(default)]
    pub retcode: Option<i64>,

    /// Call-specific payload: object, array or scalar.
    #[serde(default)]
    pub result: Value,

    /// Send-specific success indicator.
    #[serde(default, rename = "errCode")]
    pub err_code: Option<i64>,
}

impl Envelope {
    /// Parse an envelope from a response body.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Malformed`] if the body is not valid envelope
    /// JSON.
    pub fn parse(body: &[u8]) -> Result<Self, ApiError> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Unwrap the `result` payload.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::SessionDesynced`] on return code 103,
    /// [`ApiError::Retcode`] on any other non-zero code, and
    /// [`ApiError::MissingField`] when the code is absent.
    pub fn into_result(self) -> Result<Value, ApiError> {
        match self.retcode {
            Some(0) => Ok(self.result),
            Some(RETCODE_SESSION_DESYNC) => Err(ApiError::SessionDesynced),
            Some(code) => Err(ApiError::Retcode(code)),
            None => Err(ApiError::MissingField("retcode")),
        }
    }

    /// Check the dedicated send-result envelope: `errCode` gates success,
    /// and a failure surfaces the API return code.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::SendRejected`] unless `errCode` is exactly `0`.
    pub fn check_send(&self) -> Result<(), ApiError> {
        if self.err_code == Some(0) {
            Ok(())
        } else {
            Err(ApiError::SendRejected(
                self.retcode.or(self.err_code).unwrap_or(-1),
            ))
        }
    }
}
