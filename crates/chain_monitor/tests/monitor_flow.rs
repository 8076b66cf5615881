use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use chain_monitor::{ChainConfig, ChainEventMonitor, MonitorConfig, SIGNAL_SENT_SIGNATURE};

struct MockChain {
    head: AtomicU64,
    /// ABI-encoded SignalSent log body, redelivered on every getLogs call.
    log: Value,
}

fn encode_signal_sent_log() -> Value {
    let mut data = Vec::new();
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(&[0xaa; 20]);
    data.extend_from_slice(&word);
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(&[0xbb; 20]);
    data.extend_from_slice(&word);
    let mut word = [0u8; 32];
    word[28..].copy_from_slice(&7u32.to_be_bytes());
    data.extend_from_slice(&word);
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&(5u64 * 32).to_be_bytes());
    data.extend_from_slice(&word);
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&1_700_000_000u64.to_be_bytes());
    data.extend_from_slice(&word);
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&2u64.to_be_bytes());
    data.extend_from_slice(&word);
    let mut tail = vec![0xde, 0xad];
    tail.resize(32, 0);
    data.extend_from_slice(&tail);

    let topic_u32 = |value: u32| {
        let mut w = [0u8; 32];
        w[28..].copy_from_slice(&value.to_be_bytes());
        format!("0x{}", hex::encode(w))
    };

    json!({
        "address": "0x1111111111111111111111111111111111111111",
        "topics": [
            chain_monitor::decode::topic_hash(SIGNAL_SENT_SIGNATURE),
            format!("0x{}", hex::encode([0x01u8; 32])),
            topic_u32(1),
            topic_u32(56),
        ],
        "data": format!("0x{}", hex::encode(data)),
        "blockNumber": "0x9",
        "transactionHash": format!("0x{}", hex::encode([0x02u8; 32])),
        "removed": false,
    })
}

async fn rpc_handler(State(state): State<Arc<MockChain>>, Json(request): Json<Value>) -> Json<Value> {
    let id = request["id"].clone();
    match request["method"].as_str() {
        Some("eth_blockNumber") => {
            let head = state.head.fetch_add(1, Ordering::SeqCst);
            Json(json!({ "jsonrpc": "2.0", "id": id, "result": format!("{head:#x}") }))
        }
        Some("eth_getLogs") => {
            let wanted = request["params"][0]["topics"][0].as_str().unwrap_or_default();
            let sent_topic = chain_monitor::decode::topic_hash(SIGNAL_SENT_SIGNATURE);
            let result = if wanted == sent_topic {
                json!([state.log])
            } else {
                json!([])
            };
            Json(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
        }
        _ => Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -32601, "message": "method not found" }
        })),
    }
}

async fn spawn_mock_chain() -> anyhow::Result<String> {
    let state = Arc::new(MockChain {
        head: AtomicU64::new(10),
        log: encode_signal_sent_log(),
    });
    let app = Router::new().route("/", post(rpc_handler)).with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}/"))
}

fn monitor_config(rpc_url: &str) -> anyhow::Result<MonitorConfig> {
    Ok(MonitorConfig {
        chains: vec![ChainConfig {
            chain_id: 1,
            name: "mockchain".into(),
            rpc_url: rpc_url.parse()?,
            signal_address: "0x1111111111111111111111111111111111111111".into(),
            confirmation_depth: 2,
            poll_interval_ms: 100,
            batch_blocks: 100,
        }],
        dedup_capacity: 1024,
    })
}

#[tokio::test]
async fn confirmed_signal_is_emitted_exactly_once() -> anyhow::Result<()> {
    let rpc_url = spawn_mock_chain().await?;
    let (monitor, mut events) = ChainEventMonitor::start(monitor_config(&rpc_url)?)?;

    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await?
        .expect("monitor should emit the confirmed signal");
    assert_eq!(event.chain_id, 1);
    assert_eq!(event.src_chain_id, 1);
    assert_eq!(event.dst_chain_id, 56);
    assert_eq!(event.nonce, 7);
    assert_eq!(event.payload, vec![0xde, 0xad]);
    assert_eq!(event.block_number, 9);

    // The mock redelivers the same log on every poll; the dedup ring must
    // swallow all of them.
    let redelivered = tokio::time::timeout(Duration::from_millis(600), events.recv()).await;
    assert!(redelivered.is_err(), "redelivered signal must be deduplicated");

    let health = monitor.health_check().await;
    let (name, chain_health) = &health[&1];
    assert_eq!(name, "mockchain");
    assert!(chain_health.healthy);
    assert!(chain_health.last_block >= 10);

    monitor.stop().await?;
    Ok(())
}

#[tokio::test]
async fn unreachable_provider_reports_unhealthy() -> anyhow::Result<()> {
    // Nothing listens on this port.
    let (monitor, _events) = ChainEventMonitor::start(monitor_config("http://127.0.0.1:1/")?)?;

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(!monitor.all_healthy().await);

    monitor.stop().await?;
    Ok(())
}
