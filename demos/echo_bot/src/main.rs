//! Echo Bot Demo
//!
//! A console-driven demonstration of the Ember runtime. Lines typed on
//! stdin become chat messages; replies are printed by a console transport
//! plugin.
//!
//! What it exercises:
//!
//! - A transport plugin providing the `send` capability
//! - A passthrough subscriber echoing plain messages
//! - A `ping` command and the built-in `help` command
//! - A cron heartbeat firing on the timer tick
//!
//! # Usage
//!
//! ```bash
//! cargo run --package echo-bot
//! > hello            # echoed back
//! > !ph#ping         # Pong!
//! > !ph#help         # command overview
//! ```

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;

use ember::prelude::*;

// ============================================================================
// Console transport
// ============================================================================

/// Prints outgoing messages to the console.
struct ConsoleSender;

#[async_trait]
impl SendCapability for ConsoleSender {
    async fn send(
        &self,
        chat_id: &str,
        text: &str,
        _attachments: &[String],
    ) -> Result<(), SendError> {
        println!("[{chat_id}] {text}");
        Ok(())
    }
}

/// Registers the console transport as the `send` capability.
struct ConsoleTransportPlugin;

#[async_trait]
impl Plugin for ConsoleTransportPlugin {
    fn name(&self) -> &'static str {
        "console_transport"
    }

    fn provides(&self) -> &'static [&'static str] {
        &[SEND_SERVICE]
    }

    async fn on_load(&self, ctx: &LoadContext) -> Result<(), HandlerError> {
        let sender: Arc<dyn SendCapability> = Arc::new(ConsoleSender);
        ctx.register_service(SEND_SERVICE, sender)?;
        Ok(())
    }
}

// ============================================================================
// Echo plugin
// ============================================================================

/// Echoes plain messages, answers `ping`, and keeps a heartbeat job.
struct EchoPlugin;

#[async_trait]
impl Plugin for EchoPlugin {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn consumes(&self) -> &'static [&'static str] {
        &[SEND_SERVICE]
    }

    async fn on_load(&self, ctx: &LoadContext) -> Result<(), HandlerError> {
        // Echo every plain (untriggered) message back to its chat.
        let runtime = ctx.runtime_handle();
        ctx.subscribe(
            EventKind::PlainMessage,
            Arc::new(move |event| {
                let runtime = Arc::clone(&runtime);
                Box::pin(async move {
                    if let Event::PlainMessage(msg) = event.as_ref()
                        && !msg.text.is_empty()
                        && !msg.text.starts_with('!')
                        && let Some(send) = runtime.send_capability()
                    {
                        send.send(&msg.chat_id, &format!("echo: {}", msg.text), &[])
                            .await?;
                    }
                    Ok(())
                })
            }),
        );

        ctx.register_command(
            "ping",
            "Responds with Pong!",
            Arc::new(|_| Box::pin(async { Ok(CommandReply::text("Pong!")) })),
        )?;

        ctx.register_job(
            "heartbeat",
            JobSpec::every(std::time::Duration::from_secs(300)),
            Arc::new(|| {
                Box::pin(async {
                    info!("Heartbeat: still alive");
                    Ok(())
                })
            }),
        )?;

        Ok(())
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let runtime = EmberRuntime::new();
    runtime.register_plugin(Arc::new(ConsoleTransportPlugin));
    runtime.register_plugin(Arc::new(EchoPlugin));
    runtime.spawn_signal_handler();

    // Feed stdin lines to the runtime as chat messages.
    let (tx, rx) = mpsc::channel(32);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let msg = ChatMessage::new("console", "user", line, Utc::now());
            if tx.send(Event::Message(msg)).await.is_err() {
                break;
            }
        }
        // Dropping tx closes the inbound channel and stops the runtime.
    });

    runtime.run(rx).await?;
    Ok(())
}
