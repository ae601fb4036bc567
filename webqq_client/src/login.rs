//! The QR login handshake.
//!
//! Six strictly ordered stages, each consuming the previous one's output;
//! a failure at any stage aborts the whole sequence and no partial
//! credential set is usable. QR expiry is a legitimate outcome, not an
//! error.

use std::time::Duration;

use rand::Rng;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use webqq_core::{envelope, error::ApiError, status::UserStatus, CLIENT_ID};

use crate::{
    api,
    error::ClientError,
    http::{get_api, post_api, referer_headers, HttpTransport},
    session::Session,
    QR_FETCH_TIMEOUT_SECS, QR_POLL_INTERVAL_SECS,
};

/// Marker the confirmation endpoint embeds once the QR code was scanned and
/// accepted.
const QR_CONFIRMED_MARKER: &str = "成功";

/// Marker the confirmation endpoint embeds once the QR code expired.
const QR_EXPIRED_MARKER: &str = "已失效";

/// Name of the cookie carrying the stage-3 token.
const PTWEBQQ_COOKIE: &str = "ptwebqq";

/// Result of handshake stages 2-6.
#[derive(Debug)]
pub(crate) enum Handshake {
    /// The QR code expired before it was scanned.
    Expired,
    /// All stages completed.
    Complete {
        session: Session,
        status: UserStatus,
    },
}

/// Stage 1: fetch the QR challenge image, preceded by the portal warm-up
/// GET a browser would have issued.
pub(crate) async fn fetch_qr_code<H: HttpTransport>(http: &H) -> Result<Vec<u8>, ClientError> {
    debug!("fetching QR challenge");
    http.get(
        api::HOME_PAGE.url(),
        &[("Upgrade-Insecure-Requests", "1")],
        None,
    )
    .await
    .map_err(ClientError::http)?;

    let response = http
        .get(
            api::GET_QR_CODE.url(),
            &[],
            Some(Duration::from_secs(QR_FETCH_TIMEOUT_SECS)),
        )
        .await
        .map_err(ClientError::http)?;
    envelope::check_status(response.status)?;
    debug!(bytes = response.body.len(), "QR challenge fetched");
    Ok(response.body)
}

/// Stages 2-6.
pub(crate) async fn run<H: HttpTransport>(http: &H) -> Result<Handshake, ClientError> {
    let Some(redirect) = await_qr_confirmation(http).await? else {
        info!("QR code expired before it was scanned");
        return Ok(Handshake::Expired);
    };
    let ptwebqq = exchange_ptwebqq(http, &redirect).await?;
    let vfwebqq = exchange_vfwebqq(http, &ptwebqq).await?;
    let (psessionid, uin, status) = exchange_session(http, &ptwebqq).await?;
    let session = Session {
        ptwebqq,
        vfwebqq,
        uin,
        psessionid,
    };
    prime_poll_channel(http, &session).await?;
    info!(uin, "login handshake complete");
    Ok(Handshake::Complete { session, status })
}

/// Stage 2: poll the confirmation endpoint once per second until the QR
/// code is scanned and accepted (yielding the redirect URL) or expires.
/// There is no timeout; only a transport failure ends the wait early.
async fn await_qr_confirmation<H: HttpTransport>(http: &H) -> Result<Option<String>, ClientError> {
    debug!("waiting for QR confirmation");
    loop {
        tokio::time::sleep(Duration::from_secs(QR_POLL_INTERVAL_SECS)).await;
        let response = http
            .get(
                api::VERIFY_QR_CODE.url(),
                &referer_headers(&api::VERIFY_QR_CODE),
                None,
            )
            .await
            .map_err(ClientError::http)?;
        let body = response.text();
        if body.contains(QR_CONFIRMED_MARKER) {
            if let Some(redirect) = body.split("','").find(|part| part.starts_with("http")) {
                info!("QR code confirmed, continuing login");
                return Ok(Some(redirect.to_owned()));
            }
        } else if body.contains(QR_EXPIRED_MARKER) {
            return Ok(None);
        }
    }
}

/// Stage 3: follow the confirmation redirect and lift the `ptwebqq` cookie
/// out of the jar. A missing cookie is tolerated; later stages then run
/// with an empty token.
async fn exchange_ptwebqq<H: HttpTransport>(
    http: &H,
    redirect: &str,
) -> Result<String, ClientError> {
    debug!("exchanging ptwebqq token");
    http.get(redirect, &[], None)
        .await
        .map_err(ClientError::http)?;
    match http.cookie(redirect, PTWEBQQ_COOKIE) {
        Some(token) => Ok(token),
        None => {
            warn!("ptwebqq cookie absent, continuing with an empty token");
            Ok(String::new())
        }
    }
}

/// Stage 4: trade the `ptwebqq` token for the `vfwebqq` token.
async fn exchange_vfwebqq<H: HttpTransport>(http: &H, ptwebqq: &str) -> Result<String, ClientError> {
    debug!("exchanging vfwebqq token");
    let url = api::GET_VFWEBQQ.with(&[&ptwebqq]);
    let response = get_api(http, &api::GET_VFWEBQQ, &url, None).await?;
    let result = envelope::validate(response.status, &response.body)?;
    let vfwebqq = result
        .get("vfwebqq")
        .and_then(Value::as_str)
        .ok_or(ApiError::MissingField("vfwebqq"))?;
    Ok(vfwebqq.to_owned())
}

/// Stage 5: seed the synthetic tracking cookies on the parent domain, warm
/// up the login and channel proxy pages (responses discarded), then trade
/// the token for `psessionid`, `uin` and the initial presence status.
async fn exchange_session<H: HttpTransport>(
    http: &H,
    ptwebqq: &str,
) -> Result<(String, i64, UserStatus), ClientError> {
    debug!("exchanging session id");
    http.add_cookie(
        api::HOME_PAGE.url(),
        &format!("pgv_info=ssid=s{}; Domain=qq.com", random_digits(10)),
    );
    http.add_cookie(
        api::HOME_PAGE.url(),
        &format!("pgv_pvid={}; Domain=qq.com", random_digits(10)),
    );

    http.get(api::LOGIN_PAGE.url(), &warmup_headers(&api::LOGIN_PAGE), None)
        .await
        .map_err(ClientError::http)?;
    http.get(api::PROXY_PAGE.url(), &warmup_headers(&api::PROXY_PAGE), None)
        .await
        .map_err(ClientError::http)?;

    let payload = json!({
        "ptwebqq": ptwebqq,
        "clientid": CLIENT_ID,
        "psessionid": "",
        "status": UserStatus::Online.code(),
    });
    let response = post_api(http, &api::GET_UIN_AND_PSESSIONID, payload.to_string(), None).await?;
    let result = envelope::validate(response.status, &response.body)?;

    let psessionid = result
        .get("psessionid")
        .and_then(Value::as_str)
        .ok_or(ApiError::MissingField("psessionid"))?
        .to_owned();
    let uin = result
        .get("uin")
        .and_then(Value::as_i64)
        .ok_or(ApiError::MissingField("uin"))?;
    let code = result.get("status").and_then(Value::as_str).unwrap_or_default();
    let status = UserStatus::from_code(code).unwrap_or_else(|| {
        warn!(code, "unknown presence code from server, assuming online");
        UserStatus::Online
    });
    Ok((psessionid, uin, status))
}

/// Stage 6: one validated, discarded GET that primes the server-side
/// polling state; skipping it earns return code 103 on the first poll.
async fn prime_poll_channel<H: HttpTransport>(
    http: &H,
    session: &Session,
) -> Result<(), ClientError> {
    debug!("priming poll channel");
    let url = api::AVOID_RETCODE_103.with(&[&session.vfwebqq, &CLIENT_ID, &session.psessionid]);
    let response = get_api(http, &api::AVOID_RETCODE_103, &url, None).await?;
    envelope::validate(response.status, &response.body)?;
    Ok(())
}

fn warmup_headers(endpoint: &api::ApiUrl) -> Vec<(&'static str, &'static str)> {
    let mut headers = referer_headers(endpoint);
    headers.push(("Upgrade-Insecure-Requests", "1"));
    headers
}

/// A random run of decimal digits for the synthetic tracking cookies; the
/// values are opaque to the server.
fn random_digits(count: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}
