//! Query-endpoint tests: signed list requests, status changes, desync
//! detection.

#![allow(clippy::expect_used, clippy::unwrap_used, missing_docs)]

mod common;

use std::sync::Arc;

use testresult::TestResult;
use webqq_client::WebQqClient;
use webqq_core::{hash, status::UserStatus};

use common::{reply, RecordingListener, ScriptedTransport};

async fn logged_in_client(transport: &ScriptedTransport) -> Arc<WebQqClient<ScriptedTransport>> {
    common::script_successful_login(transport);
    let client = Arc::new(WebQqClient::with_transport(
        transport.clone(),
        RecordingListener::new(),
    ));
    client.login().await.expect("login");
    client
}

// ─── Signed List Requests ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn friend_list_request_carries_the_session_hash() -> TestResult {
    common::init_tracing();
    let transport = ScriptedTransport::new();
    let client = logged_in_client(&transport).await;

    transport.enqueue(
        "get_user_friends2",
        reply(
            200,
            r#"{"retcode":0,"result":{"info":[{"uin":10,"nick":"alpha"}],"marknames":[],"vipinfo":[]}}"#,
        ),
    );

    let friends = client.get_friend_list().await?;
    assert_eq!(friends.len(), 1);
    assert_eq!(friends[0].nickname, "alpha");

    let payload = transport
        .requests()
        .iter()
        .find(|request| request.url.contains("get_user_friends2"))
        .expect("friend list request")
        .payload()
        .expect("payload");
    assert_eq!(payload["vfwebqq"].as_str(), Some(common::VFWEBQQ));
    assert_eq!(
        payload["hash"].as_str(),
        Some(hash::signature(common::UIN, common::PTWEBQQ).as_str())
    );

    client.close_now().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn group_list_is_decoded_from_gnamelist() -> TestResult {
    common::init_tracing();
    let transport = ScriptedTransport::new();
    let client = logged_in_client(&transport).await;

    transport.enqueue(
        "get_group_name_list_mask2",
        reply(
            200,
            r#"{"retcode":0,"result":{"gnamelist":[{"gid":1,"code":11,"name":"team"},{"gid":2,"code":22,"name":"chat"}]}}"#,
        ),
    );

    let groups = client.get_group_list().await?;
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[1].name, "chat");

    client.close_now().await;
    Ok(())
}

// ─── Status Change ───────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn change_status_updates_the_local_cell_after_acceptance() -> TestResult {
    common::init_tracing();
    let transport = ScriptedTransport::new();
    let client = logged_in_client(&transport).await;
    assert_eq!(client.self_status(), UserStatus::Online);

    transport.enqueue("change_status2", reply(200, r#"{"retcode":0,"result":"ok"}"#));
    client.change_status(UserStatus::Busy).await?;
    assert_eq!(client.self_status(), UserStatus::Busy);

    let request = transport
        .requests()
        .iter()
        .find(|request| request.url.contains("change_status2"))
        .expect("status request")
        .clone();
    assert!(request.url.contains("newstatus=busy"));
    assert!(request.url.contains(common::PSESSIONID));

    client.close_now().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn rejected_status_change_leaves_the_cell_untouched() -> TestResult {
    common::init_tracing();
    let transport = ScriptedTransport::new();
    let client = logged_in_client(&transport).await;

    transport.enqueue("change_status2", reply(200, r#"{"retcode":100}"#));
    client
        .change_status(UserStatus::Hidden)
        .await
        .expect_err("rejected");
    assert_eq!(client.self_status(), UserStatus::Online);

    client.close_now().await;
    Ok(())
}

// ─── Desync Detection ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn retcode_103_surfaces_as_desync_to_the_caller() -> TestResult {
    common::init_tracing();
    let transport = ScriptedTransport::new();
    let client = logged_in_client(&transport).await;

    transport.enqueue("get_group_name_list_mask2", reply(200, r#"{"retcode":103}"#));
    let error = client.get_group_list().await.expect_err("desync");
    assert!(error.is_desync());

    client.close_now().await;
    Ok(())
}
