use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde_json::{Map, Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uplink_adapters::{QueueAdapter, StdioAdapter, WebSocketAdapter};
use uplink_bridge::{BridgeConfig, CommandFn, EventForwarder, EventMode, UiBridge};
use uplink_protocol::{BridgeError, CommandTypes};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TransportKind {
    /// In-process queue drained by a logging forwarder.
    Queue,
    /// JSON lines on stdout, commands from stdin.
    Stdio,
    /// WebSocket server broadcasting to connected clients.
    Websocket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    UiFriendly,
    Native,
    Both,
}

impl From<ModeArg> for EventMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::UiFriendly => Self::UiFriendly,
            ModeArg::Native => Self::Native,
            ModeArg::Both => Self::Both,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "uplinkd")]
#[command(about = "uplink bridge demo daemon")]
struct Cli {
    #[arg(long, value_enum, default_value_t = TransportKind::Queue)]
    transport: TransportKind,
    #[arg(long, value_enum, default_value_t = ModeArg::UiFriendly)]
    mode: ModeArg,
    #[arg(long, default_value = "127.0.0.1:8790")]
    listen: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .compact()
        .init();

    let cli = Cli::parse();

    let config = BridgeConfig {
        event_mode: cli.mode.into(),
        ..Default::default()
    };
    let bridge = Arc::new(UiBridge::new(config)?);
    register_demo_commands(&bridge);

    match cli.transport {
        TransportKind::Queue => run_queue(bridge).await,
        TransportKind::Stdio => run_stdio(bridge).await,
        TransportKind::Websocket => run_websocket(bridge, cli.listen).await,
    }
}

fn register_demo_commands(bridge: &Arc<UiBridge>) {
    bridge.register_command(
        CommandTypes::SUBMIT_PROMPT,
        CommandFn(|data: Map<String, Value>| async move {
            let prompt = data
                .get("prompt")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned();
            info!(%prompt, "prompt submitted from UI");
            Ok::<_, BridgeError>(json!({"queued": true}))
        }),
    );
    bridge.register_command(
        CommandTypes::CANCEL_GENERATION,
        CommandFn(|_data: Map<String, Value>| async move {
            info!("generation cancelled from UI");
            Ok::<_, BridgeError>(json!({"cancelled": true}))
        }),
    );
}

/// Replay a scripted host session through the bridge.
async fn demo_session(bridge: &UiBridge) {
    let session = "demo-session";
    let steps: Vec<(&str, Value)> = vec![
        (
            "session:start",
            json!({"session_id": session, "prompt": "Summarize the repo"}),
        ),
        (
            "content_block:start",
            json!({"session_id": session, "block_type": "thinking", "block_index": 0}),
        ),
        (
            "thinking:delta",
            json!({"session_id": session, "block_index": 0, "delta": "Reading the tree, "}),
        ),
        (
            "thinking:delta",
            json!({"session_id": session, "block_index": 0, "delta": "then the manifests."}),
        ),
        (
            "content_block:end",
            json!({
                "session_id": session,
                "block_index": 0,
                "block": {"type": "thinking"},
                "usage": {"input_tokens": 214, "output_tokens": 41},
            }),
        ),
        (
            "tool:pre",
            json!({
                "session_id": session,
                "tool_name": "read_file",
                "tool_use_id": "use-1",
                "tool_input": {"path": "Cargo.toml"},
            }),
        ),
        (
            "tool:post",
            json!({
                "session_id": session,
                "tool_name": "read_file",
                "tool_use_id": "use-1",
                "tool_response": {"success": true, "output": "[workspace]…"},
            }),
        ),
        (
            "orchestrator:complete",
            json!({
                "session_id": session,
                "content": "A four-crate workspace bridging host events to UIs.",
                "turn_count": 1,
                "status": "ok",
            }),
        ),
        ("session:end", json!({"session_id": session, "status": "ok"})),
    ];

    for (name, payload) in steps {
        let Value::Object(payload) = payload else {
            continue;
        };
        bridge.dispatch(name, payload).await;
    }
}

async fn run_queue(bridge: Arc<UiBridge>) -> Result<()> {
    let adapter = Arc::new(QueueAdapter::default());
    let receiver = adapter
        .take_event_receiver()
        .context("fresh adapter has a receiver")?;
    bridge.set_adapter(adapter.clone());

    let forwarder = EventForwarder::new(receiver, |event: Value| async move {
        info!(event = %event, "event.forwarded");
        Ok::<(), anyhow::Error>(())
    })
    .spawn();
    let relay = bridge.spawn_command_relay(adapter.clone());

    demo_session(&bridge).await;

    // Let the UI send something back through the queue transport.
    adapter
        .command_sender()
        .send(uplink_protocol::UICommand::new(
            CommandTypes::SUBMIT_PROMPT,
            serde_json::from_value(json!({"prompt": "and now?"}))?,
        ))?;

    tokio::time::sleep(Duration::from_millis(200)).await;
    relay.stop();
    relay.join().await;
    forwarder.stop();
    forwarder.join().await;
    Ok(())
}

async fn run_stdio(bridge: Arc<UiBridge>) -> Result<()> {
    let adapter = Arc::new(StdioAdapter::stdio());
    bridge.set_adapter(adapter.clone());
    let relay = bridge.spawn_command_relay(adapter);

    demo_session(&bridge).await;

    // Keep serving inbound commands until the shell closes stdin.
    shutdown_signal().await;
    relay.stop();
    relay.join().await;
    Ok(())
}

async fn run_websocket(bridge: Arc<UiBridge>, listen: SocketAddr) -> Result<()> {
    let adapter = WebSocketAdapter::new(256);
    bridge.set_adapter(adapter.clone());
    let relay = bridge.spawn_command_relay(adapter.clone());

    let app = adapter
        .router()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!(%listen, "uplinkd websocket transport listening on /events");

    let replay_bridge = bridge.clone();
    let replay = tokio::spawn(async move {
        // Give the first client a moment to connect, then replay.
        tokio::time::sleep(Duration::from_secs(1)).await;
        demo_session(&replay_bridge).await;
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    replay.abort();
    relay.stop();
    relay.join().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        info!(%error, "shutdown signal unavailable");
    }
}
