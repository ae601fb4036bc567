//! Background poll task.
//!
//! One task per logged-in client. Each round races the long-poll request
//! against the cancellation channel: a graceful stop lets the in-flight
//! round finish and dispatch, an immediate stop closes the channel, fails
//! the race, and the loop exits without reporting anything.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use serde_json::json;
use tracing::{debug, info, warn};

use webqq_core::{
    envelope,
    message::{parse_poll_events, PollEvent},
    CLIENT_ID,
};

use crate::{
    api,
    error::ClientError,
    events::{ErrorOrigin, EventListener},
    http::{post_api, HttpResponse, HttpTransport},
    session::Session,
    POLL_RETRY_PAUSE_SECS, POLL_TIMEOUT_SECS,
};

pub(super) async fn poll_loop<H: HttpTransport>(
    http: Arc<H>,
    session: Arc<Session>,
    listener: Arc<dyn EventListener>,
    polling: Arc<AtomicBool>,
    cancel: async_channel::Receiver<()>,
) {
    info!("starting poll loop");

    loop {
        if !polling.load(Ordering::SeqCst) {
            info!("poll loop: stop requested, exiting");
            break;
        }

        let outcome = tokio::select! {
            result = poll_once(http.as_ref(), &session) => result,
            _ = cancel.recv() => Err(ClientError::Aborted),
        };

        match outcome {
            Ok(response) => {
                if let Err(error) = dispatch(&response, listener.as_ref()) {
                    warn!(%error, "poll round rejected during dispatch");
                    listener.on_error(&error, ErrorOrigin::PollDispatch);
                    pause_before_retry().await;
                }
            }
            Err(ClientError::Aborted) => {
                debug!("poll loop: in-flight round aborted by caller");
                break;
            }
            Err(error) => {
                warn!(%error, "poll round failed");
                listener.on_error(&error, ErrorOrigin::PollIo);
                pause_before_retry().await;
            }
        }
    }

    info!("poll loop exited");
}

/// Issue one long-poll round. The server holds the request open until an
/// event arrives or the multi-minute timeout elapses.
async fn poll_once<H: HttpTransport>(
    http: &H,
    session: &Session,
) -> Result<HttpResponse, ClientError> {
    let payload = json!({
        "ptwebqq": session.ptwebqq,
        "clientid": CLIENT_ID,
        "psessionid": session.psessionid,
        "key": "",
    });
    post_api(
        http,
        &api::POLL_MESSAGE,
        payload.to_string(),
        Some(Duration::from_secs(POLL_TIMEOUT_SECS)),
    )
    .await
}

/// Validate a completed round and dispatch its events, strictly in server
/// order, on the poll task.
fn dispatch(response: &HttpResponse, listener: &dyn EventListener) -> Result<(), ClientError> {
    let result = envelope::validate(response.status, &response.body)?;
    let events = parse_poll_events(&result);
    if !events.is_empty() {
        debug!(count = events.len(), "dispatching poll events");
    }
    for event in events {
        match event {
            PollEvent::Message(message) => listener.on_message(message),
            PollEvent::GroupMessage(message) => listener.on_group_message(message),
            PollEvent::DiscussMessage(message) => listener.on_discuss_message(message),
        }
    }
    Ok(())
}

async fn pause_before_retry() {
    tokio::time::sleep(Duration::from_secs(POLL_RETRY_PAUSE_SECS)).await;
}
