mod utils;

use axum_test::TestServer;
use axum_test::http::StatusCode;

use global_utils::common_types::unix_timestamp_ms;
use transport_bus::{PartyIdentity, SignedEnvelope, WireMessage, WirePayload};
use validator_server::init::ValidatorApi;

use crate::utils::common::{TestContext, party};

#[tokio::test]
async fn health_reports_ok_for_a_fresh_node() -> anyhow::Result<()> {
    let ctx = TestContext::start().await?;
    let server = TestServer::new(ctx.app())?;

    let response = server.get(ValidatorApi::HEALTH_ENDPOINT).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["healthy"], true);
    assert_eq!(body["has_key_share"], false);
    Ok(())
}

#[tokio::test]
async fn status_exposes_party_and_pending() -> anyhow::Result<()> {
    let ctx = TestContext::start().await?;
    let server = TestServer::new(ctx.app())?;

    let response = server.get(ValidatorApi::STATUS_ENDPOINT).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["party_id"], 1);
    assert!(body["pending_requests"].as_array().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn metrics_renders_prometheus_text() -> anyhow::Result<()> {
    let ctx = TestContext::start().await?;
    let server = TestServer::new(ctx.app())?;

    let response = server.get(ValidatorApi::METRICS_ENDPOINT).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let text = response.text();
    assert!(text.contains("# TYPE bridge_signing_requests_total counter"));
    Ok(())
}

fn heartbeat_message(sender: u16, sequence: u64) -> WireMessage {
    WireMessage {
        sender: party(sender),
        context: "control".to_string(),
        sequence,
        timestamp_ms: unix_timestamp_ms(),
        payload: WirePayload::Heartbeat {
            uptime_secs: 1,
            active_chains: vec![1],
            pending: 0,
            has_key_share: false,
        },
    }
}

#[tokio::test]
async fn transport_accepts_a_registered_peer() -> anyhow::Result<()> {
    let ctx = TestContext::start().await?;
    let server = TestServer::new(ctx.app())?;

    let envelope = SignedEnvelope::seal(ctx.identity_of(2).signing_key(), heartbeat_message(2, 0))?;
    let response = server
        .post(ValidatorApi::TRANSPORT_MESSAGE_ENDPOINT)
        .json(&envelope)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn transport_rejects_a_forged_envelope() -> anyhow::Result<()> {
    let ctx = TestContext::start().await?;
    let server = TestServer::new(ctx.app())?;

    // Signed with a key that is not party 2's registered identity.
    let rogue = PartyIdentity::generate();
    let envelope = SignedEnvelope::seal(rogue.signing_key(), heartbeat_message(2, 0))?;
    let response = server
        .post(ValidatorApi::TRANSPORT_MESSAGE_ENDPOINT)
        .json(&envelope)
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn transport_rejects_an_unknown_sender() -> anyhow::Result<()> {
    let ctx = TestContext::start().await?;
    let server = TestServer::new(ctx.app())?;

    let rogue = PartyIdentity::generate();
    // Party 9 has no registered identity at all.
    let mut message = heartbeat_message(5, 0);
    message.sender = party(9);
    let envelope = SignedEnvelope::seal(rogue.signing_key(), message)?;
    let response = server
        .post(ValidatorApi::TRANSPORT_MESSAGE_ENDPOINT)
        .json(&envelope)
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    Ok(())
}
