//! HTTP transport seam.
//!
//! Abstracts the HTTP client so the login sequencer, poll loop and send
//! path can be exercised against a scripted transport in tests, while
//! [`ReqwestTransport`] does the real work: cookie jar, redirect following,
//! browser user agent, per-request timeouts.

use std::{sync::Arc, time::Duration};

use futures::{future::BoxFuture, FutureExt};
use reqwest::cookie::{CookieStore, Jar};
use tracing::warn;
use url::Url;

use crate::{api::ApiUrl, error::ClientError, DEFAULT_REQUEST_TIMEOUT_SECS, USER_AGENT};

/// A minimal HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub status: u16,

    /// The response body bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// The body decoded as UTF-8, lossily.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A minimal async HTTP client plus the cookie-jar operations the login
/// handshake needs.
///
/// Implementations handle the mechanics of making requests (TLS, pooling,
/// redirects) while this trait exposes only what the client uses.
pub trait HttpTransport: Send + Sync + 'static {
    /// The error type for HTTP operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Issue a GET request.
    fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        timeout: Option<Duration>,
    ) -> BoxFuture<'_, Result<HttpResponse, Self::Error>>;

    /// Issue a form-encoded POST request.
    fn post_form(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        form: &[(&str, String)],
        timeout: Option<Duration>,
    ) -> BoxFuture<'_, Result<HttpResponse, Self::Error>>;

    /// Read a cookie visible to `url` from the jar.
    fn cookie(&self, url: &str, name: &str) -> Option<String>;

    /// Add a cookie to the jar. `cookie` is a `Set-Cookie` style string,
    /// e.g. `"pgv_pvid=123; Domain=qq.com"`.
    fn add_cookie(&self, url: &str, cookie: &str);
}

/// GET `url` with the endpoint's Referer.
pub(crate) async fn get_api<H: HttpTransport>(
    http: &H,
    endpoint: &ApiUrl,
    url: &str,
    timeout: Option<Duration>,
) -> Result<HttpResponse, ClientError> {
    http.get(url, &referer_headers(endpoint), timeout)
        .await
        .map_err(ClientError::http)
}

/// POST `payload` as the single form field `r`, with the endpoint's Referer
/// and derived Origin, the way the browser client submits API calls.
pub(crate) async fn post_api<H: HttpTransport>(
    http: &H,
    endpoint: &ApiUrl,
    payload: String,
    timeout: Option<Duration>,
) -> Result<HttpResponse, ClientError> {
    let mut headers: Vec<(&str, &str)> = vec![("Origin", endpoint.origin())];
    if let Some(referer) = endpoint.referer() {
        headers.push(("Referer", referer));
    }
    http.post_form(endpoint.url(), &headers, &[("r", payload)], timeout)
        .await
        .map_err(ClientError::http)
}

/// Referer header pair for an endpoint, when it carries one.
pub(crate) fn referer_headers(endpoint: &ApiUrl) -> Vec<(&'static str, &'static str)> {
    endpoint
        .referer()
        .map(|referer| ("Referer", referer))
        .into_iter()
        .collect()
}

/// A [`reqwest`]-backed transport with a shared cookie jar.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    jar: Arc<Jar>,
}

impl ReqwestTransport {
    /// Build the transport: cookie jar, redirect following, browser user
    /// agent, default request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the underlying client cannot be
    /// constructed.
    pub fn new() -> Result<Self, ClientError> {
        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .cookie_provider(Arc::clone(&jar))
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(ClientError::http)?;
        Ok(Self { client, jar })
    }

    fn apply(
        mut builder: reqwest::RequestBuilder,
        headers: &[(&str, &str)],
        timeout: Option<Duration>,
    ) -> reqwest::RequestBuilder {
        for &(name, value) in headers {
            builder = builder.header(name, value);
        }
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        builder
    }
}

impl HttpTransport for ReqwestTransport {
    type Error = reqwest::Error;

    fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        timeout: Option<Duration>,
    ) -> BoxFuture<'_, Result<HttpResponse, Self::Error>> {
        let builder = Self::apply(self.client.get(url), headers, timeout);
        async move {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let body = response.bytes().await?.to_vec();
            Ok(HttpResponse { status, body })
        }
        .boxed()
    }

    fn post_form(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        form: &[(&str, String)],
        timeout: Option<Duration>,
    ) -> BoxFuture<'_, Result<HttpResponse, Self::Error>> {
        let fields: Vec<(String, String)> = form
            .iter()
            .map(|(name, value)| ((*name).to_owned(), value.clone()))
            .collect();
        let builder = Self::apply(self.client.post(url), headers, timeout).form(&fields);
        async move {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let body = response.bytes().await?.to_vec();
            Ok(HttpResponse { status, body })
        }
        .boxed()
    }

    fn cookie(&self, url: &str, name: &str) -> Option<String> {
        let url = Url::parse(url).ok()?;
        let header = self.jar.cookies(&url)?;
        let cookies = header.to_str().ok()?.to_owned();
        cookies.split("; ").find_map(|pair| {
            pair.split_once('=')
                .filter(|(key, _)| *key == name)
                .map(|(_, value)| value.to_owned())
        })
    }

    fn add_cookie(&self, url: &str, cookie: &str) {
        match Url::parse(url) {
            Ok(url) => self.jar.add_cookie_str(cookie, &url),
            Err(error) => warn!(%error, url, "cannot scope cookie to invalid URL"),
        }
    }
}
