//! The client facade: login, sends with bounded retry, queries, presence,
//! and the poll-task lifecycle.

mod poll_loop;

use std::sync::{
    atomic::{AtomicBool, AtomicI64, Ordering},
    Arc, PoisonError, RwLock,
};

use rand::Rng;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use webqq_core::{
    content::{to_content_json, ContentElement, Font},
    envelope::{self, Envelope},
    error::ApiError,
    models::{
        self, Category, Discuss, DiscussInfo, Friend, FriendStatus, Group, GroupInfo, Recent,
        UserInfo,
    },
    status::UserStatus,
    CLIENT_ID, DEFAULT_FACE, MESSAGE_SEQ_SEED,
};

use crate::{
    api::{self, ApiUrl},
    error::ClientError,
    events::EventListener,
    http::{get_api, post_api, HttpResponse, HttpTransport, ReqwestTransport},
    login,
    session::Session,
    SEND_ATTEMPTS,
};

use poll_loop::poll_loop;

/// Result of a [`WebQqClient::login`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The handshake completed and the poll task is running.
    LoggedIn,
    /// The QR code expired before it was scanned; fetch a fresh one and try
    /// again.
    QrExpired,
}

/// A WebQQ client. One instance per account session.
///
/// Login populates the immutable [`Session`] snapshot; the poll task and
/// every authenticated call read that snapshot. Only the presence status
/// mutates after login, in its own cell.
pub struct WebQqClient<H: HttpTransport = ReqwestTransport> {
    http: Arc<H>,
    listener: Arc<dyn EventListener>,
    session: RwLock<Option<Arc<Session>>>,
    self_status: RwLock<UserStatus>,
    message_seq: AtomicI64,
    polling: Arc<AtomicBool>,
    cancel_tx: async_channel::Sender<()>,
    cancel_rx: async_channel::Receiver<()>,
    poll_handle: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl WebQqClient {
    /// Create a client over the production reqwest transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(listener: Arc<dyn EventListener>) -> Result<Self, ClientError> {
        Ok(Self::with_transport(ReqwestTransport::new()?, listener))
    }
}

impl<H: HttpTransport> WebQqClient<H> {
    /// Create a client over a custom transport.
    #[must_use]
    pub fn with_transport(http: H, listener: Arc<dyn EventListener>) -> Self {
        let (cancel_tx, cancel_rx) = async_channel::bounded(1);
        Self {
            http: Arc::new(http),
            listener,
            session: RwLock::new(None),
            self_status: RwLock::new(UserStatus::Offline),
            message_seq: AtomicI64::new(MESSAGE_SEQ_SEED),
            polling: Arc::new(AtomicBool::new(true)),
            cancel_tx,
            cancel_rx,
            poll_handle: tokio::sync::Mutex::new(None),
        }
    }

    /// Fetch the QR challenge image to present to the user.
    ///
    /// # Errors
    ///
    /// Returns an error if the challenge cannot be fetched.
    pub async fn get_qr_code(&self) -> Result<Vec<u8>, ClientError> {
        login::fetch_qr_code(self.http.as_ref()).await
    }

    /// Run login stages 2-6: block until the QR code is confirmed or
    /// expires, acquire the session token set, prime the poll channel and
    /// start the poll task.
    ///
    /// # Errors
    ///
    /// Any stage failure aborts the whole sequence; no partial credential
    /// set is usable afterwards.
    pub async fn login(&self) -> Result<LoginOutcome, ClientError> {
        match login::run(self.http.as_ref()).await? {
            login::Handshake::Expired => Ok(LoginOutcome::QrExpired),
            login::Handshake::Complete { session, status } => {
                let session = Arc::new(session);
                *self.session.write().unwrap_or_else(PoisonError::into_inner) =
                    Some(Arc::clone(&session));
                *self
                    .self_status
                    .write()
                    .unwrap_or_else(PoisonError::into_inner) = status;
                // One presence fetch warms the channel before the first
                // poll round.
                self.get_friend_status().await?;
                self.start_poll_task(session).await;
                Ok(LoginOutcome::LoggedIn)
            }
        }
    }

    async fn start_poll_task(&self, session: Arc<Session>) {
        let handle = tokio::spawn(poll_loop(
            Arc::clone(&self.http),
            session,
            Arc::clone(&self.listener),
            Arc::clone(&self.polling),
            self.cancel_rx.clone(),
        ));
        *self.poll_handle.lock().await = Some(handle);
        info!("poll task started");
    }

    /// The current session snapshot, if logged in.
    #[must_use]
    pub fn session(&self) -> Option<Arc<Session>> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn require_session(&self) -> Result<Arc<Session>, ClientError> {
        self.session().ok_or(ClientError::NotLoggedIn)
    }

    /// Account id of the logged-in user.
    #[must_use]
    pub fn self_user_id(&self) -> Option<i64> {
        self.session().map(|session| session.uin)
    }

    /// Last known presence status of the logged-in user.
    #[must_use]
    pub fn self_status(&self) -> UserStatus {
        *self
            .self_status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Send a message to a friend.
    ///
    /// # Errors
    ///
    /// See [`Self::send_message_to_group`]; identical retry and validation
    /// behavior.
    pub async fn send_message_to_friend(
        &self,
        friend_id: i64,
        content: &[ContentElement],
        font: &Font,
    ) -> Result<(), ClientError> {
        debug!(friend_id, "sending friend message");
        self.send_message(&api::SEND_MESSAGE_TO_FRIEND, "to", friend_id, content, font)
            .await
    }

    /// Send a message to a group.
    ///
    /// The identical POST is retried up to [`SEND_ATTEMPTS`] times while the
    /// raw HTTP status is not 200; the final response is then validated.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotLoggedIn`] before login; transport errors
    /// propagate without retry; after retry exhaustion the final status or
    /// the send-specific `errCode` rejection is surfaced.
    pub async fn send_message_to_group(
        &self,
        group_id: i64,
        content: &[ContentElement],
        font: &Font,
    ) -> Result<(), ClientError> {
        debug!(group_id, "sending group message");
        self.send_message(&api::SEND_MESSAGE_TO_GROUP, "group_uin", group_id, content, font)
            .await
    }

    /// Send a message to a multi-user discussion.
    ///
    /// # Errors
    ///
    /// See [`Self::send_message_to_group`]; identical retry and validation
    /// behavior.
    pub async fn send_message_to_discuss(
        &self,
        discuss_id: i64,
        content: &[ContentElement],
        font: &Font,
    ) -> Result<(), ClientError> {
        debug!(discuss_id, "sending discussion message");
        self.send_message(&api::SEND_MESSAGE_TO_DISCUSS, "did", discuss_id, content, font)
            .await
    }

    async fn send_message(
        &self,
        endpoint: &ApiUrl,
        recipient_field: &str,
        recipient: i64,
        content: &[ContentElement],
        font: &Font,
    ) -> Result<(), ClientError> {
        let session = self.require_session()?;
        let mut payload = json!({
            "content": to_content_json(content, font),
            "face": DEFAULT_FACE,
            "clientid": CLIENT_ID,
            "msg_id": self.next_message_seq(),
            "psessionid": session.psessionid,
        });
        payload[recipient_field] = json!(recipient);
        let response = self.post_with_retry(endpoint, payload.to_string()).await?;
        check_send_result(&response)
    }

    fn next_message_seq(&self) -> i64 {
        self.message_seq.fetch_add(1, Ordering::SeqCst)
    }

    /// POST with bounded retry while the status is not 200. Retries are
    /// immediate; transport-level errors propagate without retry.
    async fn post_with_retry(
        &self,
        endpoint: &ApiUrl,
        payload: String,
    ) -> Result<HttpResponse, ClientError> {
        let mut attempts = 0;
        loop {
            let response = post_api(self.http.as_ref(), endpoint, payload.clone(), None).await?;
            attempts += 1;
            if response.status == 200 || attempts >= SEND_ATTEMPTS {
                return Ok(response);
            }
            warn!(status = response.status, attempts, "send attempt failed, retrying");
        }
    }

    /// Fetch the flat friend list. The request is signed with the session
    /// hash.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotLoggedIn`] before login, or any transport or
    /// envelope failure.
    pub async fn get_friend_list(&self) -> Result<Vec<Friend>, ClientError> {
        debug!("fetching friend list");
        let result = self.signed_list_request(&api::GET_FRIEND_LIST).await?;
        Ok(models::parse_friends(&result))
    }

    /// Fetch the friend list folded into its categories.
    ///
    /// # Errors
    ///
    /// See [`Self::get_friend_list`].
    pub async fn get_friend_list_with_categories(&self) -> Result<Vec<Category>, ClientError> {
        debug!("fetching categorized friend list");
        let result = self.signed_list_request(&api::GET_FRIEND_LIST).await?;
        Ok(models::parse_categories(&result))
    }

    /// Fetch the group list. The request is signed with the session hash.
    ///
    /// # Errors
    ///
    /// See [`Self::get_friend_list`].
    pub async fn get_group_list(&self) -> Result<Vec<Group>, ClientError> {
        debug!("fetching group list");
        let result = self.signed_list_request(&api::GET_GROUP_LIST).await?;
        let list = result
            .get("gnamelist")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));
        Ok(serde_json::from_value(list).map_err(ApiError::Malformed)?)
    }

    async fn signed_list_request(&self, endpoint: &ApiUrl) -> Result<Value, ClientError> {
        let session = self.require_session()?;
        let payload = json!({
            "vfwebqq": session.vfwebqq,
            "hash": session.signature(),
        });
        let response = post_api(self.http.as_ref(), endpoint, payload.to_string(), None).await?;
        Ok(envelope::validate(response.status, &response.body)?)
    }

    /// Fetch the discussion list.
    ///
    /// # Errors
    ///
    /// See [`Self::get_friend_list`].
    pub async fn get_discuss_list(&self) -> Result<Vec<Discuss>, ClientError> {
        debug!("fetching discussion list");
        let session = self.require_session()?;
        let url = api::GET_DISCUSS_LIST.with(&[&session.psessionid, &session.vfwebqq]);
        let result = self.get_validated(&api::GET_DISCUSS_LIST, &url).await?;
        let list = result
            .get("dnamelist")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));
        Ok(serde_json::from_value(list).map_err(ApiError::Malformed)?)
    }

    /// Fetch the logged-in account's detail record.
    ///
    /// # Errors
    ///
    /// See [`Self::get_friend_list`].
    pub async fn get_account_info(&self) -> Result<UserInfo, ClientError> {
        debug!("fetching account info");
        self.require_session()?;
        let result = self
            .get_validated(&api::GET_ACCOUNT_INFO, api::GET_ACCOUNT_INFO.url())
            .await?;
        Ok(serde_json::from_value(result).map_err(ApiError::Malformed)?)
    }

    /// Fetch a friend's detail record.
    ///
    /// # Errors
    ///
    /// See [`Self::get_friend_list`].
    pub async fn get_friend_info(&self, friend_id: i64) -> Result<UserInfo, ClientError> {
        debug!(friend_id, "fetching friend info");
        let session = self.require_session()?;
        let url =
            api::GET_FRIEND_INFO.with(&[&friend_id, &session.vfwebqq, &session.psessionid]);
        let result = self.get_validated(&api::GET_FRIEND_INFO, &url).await?;
        Ok(serde_json::from_value(result).map_err(ApiError::Malformed)?)
    }

    /// Fetch a group's detail record, including stitched member info.
    ///
    /// # Errors
    ///
    /// See [`Self::get_friend_list`].
    pub async fn get_group_info(&self, group_code: i64) -> Result<GroupInfo, ClientError> {
        debug!(group_code, "fetching group info");
        let session = self.require_session()?;
        let url = api::GET_GROUP_INFO.with(&[&group_code, &session.vfwebqq]);
        let result = self.get_validated(&api::GET_GROUP_INFO, &url).await?;
        Ok(models::parse_group_info(&result)?)
    }

    /// Fetch a discussion's detail record, including stitched member info.
    ///
    /// # Errors
    ///
    /// See [`Self::get_friend_list`].
    pub async fn get_discuss_info(&self, discuss_id: i64) -> Result<DiscussInfo, ClientError> {
        debug!(discuss_id, "fetching discussion info");
        let session = self.require_session()?;
        let url =
            api::GET_DISCUSS_INFO.with(&[&discuss_id, &session.vfwebqq, &session.psessionid]);
        let result = self.get_validated(&api::GET_DISCUSS_INFO, &url).await?;
        Ok(models::parse_discuss_info(&result)?)
    }

    /// Fetch the recent-conversation list.
    ///
    /// # Errors
    ///
    /// See [`Self::get_friend_list`].
    pub async fn get_recent_list(&self) -> Result<Vec<Recent>, ClientError> {
        debug!("fetching recent list");
        let session = self.require_session()?;
        let payload = json!({
            "vfwebqq": session.vfwebqq,
            "clientid": CLIENT_ID,
            "psessionid": "",
        });
        let response =
            post_api(self.http.as_ref(), &api::GET_RECENT_LIST, payload.to_string(), None).await?;
        let result = envelope::validate(response.status, &response.body)?;
        Ok(serde_json::from_value(result).map_err(ApiError::Malformed)?)
    }

    /// Fetch presence for currently online friends.
    ///
    /// # Errors
    ///
    /// See [`Self::get_friend_list`].
    pub async fn get_friend_status(&self) -> Result<Vec<FriendStatus>, ClientError> {
        debug!("fetching friend status");
        let session = self.require_session()?;
        let url = api::GET_FRIEND_STATUS.with(&[&session.vfwebqq, &session.psessionid]);
        let result = self.get_validated(&api::GET_FRIEND_STATUS, &url).await?;
        Ok(serde_json::from_value(result).map_err(ApiError::Malformed)?)
    }

    /// Resolve the public account number for an internal user id.
    ///
    /// # Errors
    ///
    /// See [`Self::get_friend_list`].
    pub async fn get_qq_by_id(&self, user_id: i64) -> Result<i64, ClientError> {
        debug!(user_id, "resolving account number");
        let session = self.require_session()?;
        let url = api::GET_QQ_BY_ID.with(&[&user_id, &session.vfwebqq]);
        let result = self.get_validated(&api::GET_QQ_BY_ID, &url).await?;
        result
            .get("account")
            .and_then(Value::as_i64)
            .ok_or_else(|| ApiError::MissingField("account").into())
    }

    /// Change the logged-in account's presence status.
    ///
    /// # Errors
    ///
    /// See [`Self::get_friend_list`]; the local status cell is only updated
    /// once the server accepts the change.
    pub async fn change_status(&self, status: UserStatus) -> Result<(), ClientError> {
        let session = self.require_session()?;
        debug!(status = %status, "changing status");
        let url = api::CHANGE_STATUS.with(&[&status.code(), &session.psessionid]);
        self.get_validated(&api::CHANGE_STATUS, &url).await?;
        *self
            .self_status
            .write()
            .unwrap_or_else(PoisonError::into_inner) = status;
        Ok(())
    }

    /// Fetch a user's avatar image bytes.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotLoggedIn`] before login, or a transport or status
    /// failure.
    pub async fn get_user_face(&self, user_id: i64) -> Result<Vec<u8>, ClientError> {
        debug!(user_id, "fetching avatar");
        let session = self.require_session()?;
        let suffix = rand::thread_rng().gen_range(0..10u8);
        let url = api::GET_USER_FACE.with(&[&suffix, &user_id, &session.vfwebqq]);
        let response = get_api(self.http.as_ref(), &api::GET_USER_FACE, &url, None).await?;
        envelope::check_status(response.status)?;
        Ok(response.body)
    }

    async fn get_validated(&self, endpoint: &ApiUrl, url: &str) -> Result<Value, ClientError> {
        let response = get_api(self.http.as_ref(), endpoint, url, None).await?;
        Ok(envelope::validate(response.status, &response.body)?)
    }

    /// Graceful stop: the poll task finishes and dispatches any in-flight
    /// round, then exits before issuing another request. Waits for the task
    /// to finish. Idempotent and callable from any task.
    pub async fn close(&self) {
        info!("closing client");
        self.polling.store(false, Ordering::SeqCst);
        self.join_poll_task().await;
    }

    /// Immediate stop: additionally aborts the in-flight poll round, which
    /// the poll task observes as a cancellation rather than an error.
    /// Waits for the task to finish. Idempotent and callable from any task.
    pub async fn close_now(&self) {
        info!("closing client immediately");
        self.polling.store(false, Ordering::SeqCst);
        self.cancel_tx.close();
        self.join_poll_task().await;
    }

    async fn join_poll_task(&self) {
        let handle = self.poll_handle.lock().await.take();
        if let Some(handle) = handle {
            if let Err(join_error) = handle.await {
                error!(%join_error, "poll task terminated abnormally");
            }
        }
    }
}

/// Validate a send response: HTTP status first, then the dedicated
/// `errCode` success indicator, which takes precedence over `retcode`.
fn check_send_result(response: &HttpResponse) -> Result<(), ClientError> {
    envelope::check_status(response.status)?;
    let envelope = Envelope::parse(&response.body)?;
    envelope.check_send()?;
    debug!("message sent");
    Ok(())
}
