//! Shared test harness: a scripted transport and a recording listener.

#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, OnceLock},
    time::Duration,
};

use futures::{future::BoxFuture, FutureExt};
use thiserror::Error;

use webqq_client::{
    error::ClientError,
    events::{ErrorOrigin, EventListener},
    http::{HttpResponse, HttpTransport},
};
use webqq_core::message::{DiscussMessage, FriendMessage, GroupMessage};

pub const PTWEBQQ: &str = "ptwebqq-token";
pub const VFWEBQQ: &str = "vf-token";
pub const PSESSIONID: &str = "psession-123";
pub const UIN: i64 = 2_735_191_957;
pub const REDIRECT_URL: &str = "https://ssl.ptlogin2.qq.com/check_sig?pttype=1&uin=2735191957";

pub fn init_tracing() {
    static ONCE: OnceLock<()> = OnceLock::new();
    ONCE.get_or_init(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

// ─── Scripted Transport ──────────────────────────────────────────────────────

/// A canned behavior for one request.
pub enum Script {
    /// Answer immediately.
    Reply(u16, String),
    /// Fail at the transport level.
    Fail(String),
    /// Hold the request open until `release` fires, then answer.
    ReplyWhen(async_channel::Receiver<()>, u16, String),
    /// Hold the request open forever, like a long-poll with nothing to say.
    Hold,
}

pub fn reply(status: u16, body: &str) -> Script {
    Script::Reply(status, body.to_owned())
}

#[derive(Debug, Error)]
#[error("scripted transport failure: {0}")]
pub struct ScriptedError(pub String);

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub url: String,
    pub form: Vec<(String, String)>,
}

impl RecordedRequest {
    /// The JSON payload posted as the `r` form field, if any.
    pub fn payload(&self) -> Option<serde_json::Value> {
        let (_, raw) = self.form.iter().find(|(name, _)| name == "r")?;
        serde_json::from_str(raw).ok()
    }
}

#[derive(Default)]
struct Inner {
    scripts: Mutex<Vec<(String, VecDeque<Script>)>>,
    requests: Mutex<Vec<RecordedRequest>>,
    cookies: Mutex<Vec<(String, String)>>,
}

/// Transport whose responses are scripted per URL path fragment. Unmatched
/// requests behave like a server holding the request open.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    inner: Arc<Inner>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `script` for the next request whose URL path contains
    /// `fragment`.
    pub fn enqueue(&self, fragment: &str, script: Script) {
        let mut scripts = self.inner.scripts.lock().expect("scripts lock");
        if let Some((_, queue)) = scripts.iter_mut().find(|(key, _)| key == fragment) {
            queue.push_back(script);
        } else {
            scripts.push((fragment.to_owned(), VecDeque::from([script])));
        }
    }

    /// Seed a cookie as if a response had set it.
    pub fn set_cookie(&self, name: &str, value: &str) {
        self.inner
            .cookies
            .lock()
            .expect("cookies lock")
            .push((name.to_owned(), value.to_owned()));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.requests.lock().expect("requests lock").clone()
    }

    pub fn requests_to(&self, fragment: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| path_of(&request.url).contains(fragment))
            .count()
    }

    fn record(&self, method: &'static str, url: &str, form: &[(&str, String)]) {
        self.inner
            .requests
            .lock()
            .expect("requests lock")
            .push(RecordedRequest {
                method,
                url: url.to_owned(),
                form: form
                    .iter()
                    .map(|(name, value)| ((*name).to_owned(), value.clone()))
                    .collect(),
            });
    }

    fn next_script(&self, url: &str) -> Option<Script> {
        let path = path_of(url);
        let mut scripts = self.inner.scripts.lock().expect("scripts lock");
        for (fragment, queue) in scripts.iter_mut() {
            if path.contains(fragment.as_str()) {
                if let Some(script) = queue.pop_front() {
                    return Some(script);
                }
            }
        }
        None
    }

    async fn run(script: Option<Script>) -> Result<HttpResponse, ScriptedError> {
        match script {
            Some(Script::Reply(status, body)) => Ok(HttpResponse {
                status,
                body: body.into_bytes(),
            }),
            Some(Script::Fail(reason)) => Err(ScriptedError(reason)),
            Some(Script::ReplyWhen(release, status, body)) => {
                let _ = release.recv().await;
                Ok(HttpResponse {
                    status,
                    body: body.into_bytes(),
                })
            }
            Some(Script::Hold) | None => futures::future::pending().await,
        }
    }
}

/// The URL without its query string, so fragments match paths rather than
/// URL-encoded parameters.
fn path_of(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

impl HttpTransport for ScriptedTransport {
    type Error = ScriptedError;

    fn get(
        &self,
        url: &str,
        _headers: &[(&str, &str)],
        _timeout: Option<Duration>,
    ) -> BoxFuture<'_, Result<HttpResponse, Self::Error>> {
        self.record("GET", url, &[]);
        let script = self.next_script(url);
        Self::run(script).boxed()
    }

    fn post_form(
        &self,
        url: &str,
        _headers: &[(&str, &str)],
        form: &[(&str, String)],
        _timeout: Option<Duration>,
    ) -> BoxFuture<'_, Result<HttpResponse, Self::Error>> {
        self.record("POST", url, form);
        let script = self.next_script(url);
        Self::run(script).boxed()
    }

    fn cookie(&self, _url: &str, name: &str) -> Option<String> {
        self.inner
            .cookies
            .lock()
            .expect("cookies lock")
            .iter()
            .find(|(cookie, _)| cookie == name)
            .map(|(_, value)| value.clone())
    }

    fn add_cookie(&self, _url: &str, cookie: &str) {
        let head = cookie.split(';').next().unwrap_or(cookie);
        if let Some((name, value)) = head.split_once('=') {
            self.set_cookie(name.trim(), value.trim());
        }
    }
}

// ─── Recording Listener ──────────────────────────────────────────────────────

/// Listener that records every callback it receives.
#[derive(Default)]
pub struct RecordingListener {
    pub messages: Mutex<Vec<FriendMessage>>,
    pub group_messages: Mutex<Vec<GroupMessage>>,
    pub discuss_messages: Mutex<Vec<DiscussMessage>>,
    pub errors: Mutex<Vec<(String, ErrorOrigin)>>,
    /// Callback kinds in arrival order.
    pub order: Mutex<Vec<&'static str>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn message_count(&self) -> usize {
        self.messages.lock().expect("messages lock").len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.lock().expect("errors lock").len()
    }

    pub fn errors(&self) -> Vec<(String, ErrorOrigin)> {
        self.errors.lock().expect("errors lock").clone()
    }

    pub fn order(&self) -> Vec<&'static str> {
        self.order.lock().expect("order lock").clone()
    }
}

impl EventListener for RecordingListener {
    fn on_message(&self, message: FriendMessage) {
        self.order.lock().expect("order lock").push("message");
        self.messages.lock().expect("messages lock").push(message);
    }

    fn on_group_message(&self, message: GroupMessage) {
        self.order.lock().expect("order lock").push("group");
        self.group_messages
            .lock()
            .expect("group messages lock")
            .push(message);
    }

    fn on_discuss_message(&self, message: DiscussMessage) {
        self.order.lock().expect("order lock").push("discuss");
        self.discuss_messages
            .lock()
            .expect("discuss messages lock")
            .push(message);
    }

    fn on_error(&self, error: &ClientError, origin: ErrorOrigin) {
        self.errors
            .lock()
            .expect("errors lock")
            .push((error.to_string(), origin));
    }
}

// ─── Login Scripting ─────────────────────────────────────────────────────────

pub fn confirmed_body() -> String {
    format!("ptuiCB('0','0','{REDIRECT_URL}','0','登录成功！', 'tester')")
}

pub fn expired_body() -> String {
    "ptuiCB('65','0','','0','二维码已失效。(4171280500)', '')".to_owned()
}

/// Script a complete successful login handshake. The poll channel itself is
/// left unscripted, so the first poll round hangs like a real long-poll.
pub fn script_successful_login(transport: &ScriptedTransport) {
    transport.set_cookie("ptwebqq", PTWEBQQ);
    transport.enqueue("ptqrlogin", reply(200, &confirmed_body()));
    transport.enqueue("check_sig", reply(200, ""));
    transport.enqueue(
        "getvfwebqq",
        reply(
            200,
            &format!(r#"{{"retcode":0,"result":{{"vfwebqq":"{VFWEBQQ}"}}}}"#),
        ),
    );
    transport.enqueue("cgi-bin/login", reply(200, ""));
    transport.enqueue("proxy.html", reply(200, ""));
    transport.enqueue(
        "channel/login2",
        reply(
            200,
            &format!(
                r#"{{"retcode":0,"result":{{"psessionid":"{PSESSIONID}","uin":{UIN},"status":"online"}}}}"#
            ),
        ),
    );
    // Poll-channel priming, then the friend-status call login issues.
    transport.enqueue("get_online_buddies2", reply(200, r#"{"retcode":0,"result":[]}"#));
    transport.enqueue("get_online_buddies2", reply(200, r#"{"retcode":0,"result":[]}"#));
}

/// A poll envelope carrying a single friend message.
pub fn poll_body_with_one_message() -> String {
    r#"{"retcode":0,"result":[{"poll_type":"message","value":{"from_uin":777,"time":1,"content":[["font",{"name":"宋体","size":10,"style":[0,0,0],"color":"000000"}],"hello"]}}]}"#
        .to_owned()
}

/// Wait until `condition` holds, advancing (possibly paused) tokio time.
pub async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}
