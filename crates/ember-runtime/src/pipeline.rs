//! The inbound message pipeline.
//!
//! One inbound [`ChatMessage`] flows through, in order:
//!
//! 1. **Age gate** - messages older than the configured bound are dropped
//!    before any dispatch, so a restart does not replay a backlog.
//! 2. **History** - the message is recorded in the chat's rolling window.
//! 3. **`Message` event** - published so observer plugins (archivers,
//!    trackers) see every message regardless of routing.
//! 4. **Routing** - a command is executed and answered; a triggered prompt
//!    goes to the AI capability with windowed context; anything else is
//!    re-published as `PlainMessage` for passthrough plugins.
//!
//! Every external call (command handler, AI reply, transport send) runs
//! under the configured timeout. Timeouts are logged distinctly from other
//! failures but handled the same way: logged, isolated, dispatch continues.
//! Handler failures stay invisible to the chat; unknown commands get an
//! explicit reply, never silence.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use ember_core::{AiError, ChatMessage, Event, HistoryEntry};
use ember_framework::{CommandInvocation, Route, RuntimeContext};

/// Stock reply when the AI collaborator fails or times out.
const FALLBACK_REPLY: &str = "Something went wrong. Please try again.";

/// Stock reply for a trigger with nothing after it.
const EMPTY_PROMPT_REPLY: &str = "Please provide a prompt.";

/// Pipeline knobs derived from the runtime configuration.
pub(crate) struct PipelineSettings {
    /// Prefix prepended to every outgoing message.
    pub message_prefix: String,
    /// Inbound messages older than this are dropped.
    pub ignore_older_than: Duration,
    /// Bound for any single external call.
    pub call_timeout: Duration,
}

/// Runs one inbound message through the full pipeline.
pub(crate) async fn handle_message(
    ctx: &Arc<RuntimeContext>,
    settings: &PipelineSettings,
    msg: ChatMessage,
) {
    let age = Utc::now().signed_duration_since(msg.timestamp);
    let max_age = chrono::Duration::from_std(settings.ignore_older_than)
        .unwrap_or_else(|_| chrono::Duration::MAX);
    if age > max_age {
        debug!(
            chat = %msg.chat_id,
            sender = %msg.sender_id,
            age_secs = age.num_seconds(),
            "Ignoring old message"
        );
        return;
    }

    ctx.history().record(&msg.chat_id, msg.to_history_entry());
    ctx.bus().publish(Event::Message(msg.clone())).await;

    match ctx.commands().route(&msg.text) {
        Route::Command {
            name,
            params,
            argument,
        } => handle_command(ctx, settings, &msg, name, params, argument).await,
        Route::AiPrompt(prompt) => handle_ai_prompt(ctx, settings, &msg, prompt).await,
        Route::Plain => ctx.bus().publish(Event::PlainMessage(msg)).await,
    }
}

/// Folds a quoted message into the free-form argument, the way the chat UI
/// presents it: argument first, quote below.
fn fold_quote(argument: Option<String>, quoted_text: Option<&str>) -> Option<String> {
    match (argument, quoted_text) {
        (Some(arg), Some(quote)) => Some(format!("{arg}\n\n{quote}")),
        (None, Some(quote)) => Some(quote.to_string()),
        (arg, None) => arg,
    }
}

async fn handle_command(
    ctx: &Arc<RuntimeContext>,
    settings: &PipelineSettings,
    msg: &ChatMessage,
    name: String,
    params: Vec<String>,
    argument: Option<String>,
) {
    let Some((plugin, handler)) = ctx.commands().lookup(&name) else {
        info!(chat = %msg.chat_id, command = %name, "Unknown command");
        send_reply(
            ctx,
            settings,
            &msg.chat_id,
            format!("Unknown command: {name}"),
            Vec::new(),
        )
        .await;
        return;
    };

    info!(
        chat = %msg.chat_id,
        sender = %msg.sender_id,
        command = %name,
        plugin = %plugin,
        "Executing command"
    );

    let invocation = CommandInvocation {
        chat_id: msg.chat_id.clone(),
        sender_id: msg.sender_id.clone(),
        params,
        argument: fold_quote(argument, msg.quoted_text.as_deref()),
        attachments: msg.attachments.clone(),
        quoted_text: msg.quoted_text.clone(),
    };

    match timeout(settings.call_timeout, handler(invocation)).await {
        Ok(Ok(reply)) => {
            send_reply(ctx, settings, &msg.chat_id, reply.text, reply.attachments).await;
        }
        Ok(Err(e)) => {
            error!(
                plugin = %plugin,
                command = %name,
                error = %e,
                "Command handler failed"
            );
        }
        Err(_) => {
            error!(
                plugin = %plugin,
                command = %name,
                timeout = ?settings.call_timeout,
                "Command handler timed out"
            );
        }
    }
}

async fn handle_ai_prompt(
    ctx: &Arc<RuntimeContext>,
    settings: &PipelineSettings,
    msg: &ChatMessage,
    prompt: String,
) {
    let prompt = fold_quote(
        (!prompt.is_empty()).then_some(prompt),
        msg.quoted_text.as_deref(),
    );
    let Some(prompt) = prompt else {
        send_reply(
            ctx,
            settings,
            &msg.chat_id,
            EMPTY_PROMPT_REPLY.to_string(),
            Vec::new(),
        )
        .await;
        return;
    };

    let Some(ai) = ctx.ai_capability() else {
        warn!(chat = %msg.chat_id, "No AI capability registered; skipping prompt");
        return;
    };

    info!(chat = %msg.chat_id, sender = %msg.sender_id, "Processing AI prompt");

    let context_entries =
        ctx.history()
            .get_context_for_ai(&msg.chat_id, Utc::now(), ctx.expiry_threshold());

    let reply = match timeout(
        settings.call_timeout,
        ai.reply(&prompt, &context_entries, &msg.attachments),
    )
    .await
    {
        Ok(Ok(text)) => text,
        Ok(Err(AiError::Timeout(bound))) => {
            error!(chat = %msg.chat_id, timeout = ?bound, "AI provider reported a timeout");
            FALLBACK_REPLY.to_string()
        }
        Ok(Err(e)) => {
            error!(chat = %msg.chat_id, error = %e, "AI provider failed");
            FALLBACK_REPLY.to_string()
        }
        Err(_) => {
            error!(
                chat = %msg.chat_id,
                timeout = ?settings.call_timeout,
                "AI call timed out"
            );
            FALLBACK_REPLY.to_string()
        }
    };

    send_reply(ctx, settings, &msg.chat_id, reply, Vec::new()).await;
}

/// Delivers a reply through the send capability and records it in history
/// under the assistant's name.
pub(crate) async fn send_reply(
    ctx: &Arc<RuntimeContext>,
    settings: &PipelineSettings,
    chat_id: &str,
    text: String,
    attachments: Vec<String>,
) {
    let text = if settings.message_prefix.is_empty() {
        text
    } else {
        format!("{}{}", settings.message_prefix, text)
    };

    let Some(send) = ctx.send_capability() else {
        warn!(chat = %chat_id, "No send capability registered; dropping reply");
        return;
    };

    match timeout(settings.call_timeout, send.send(chat_id, &text, &attachments)).await {
        Ok(Ok(())) => {
            ctx.history().record(
                chat_id,
                HistoryEntry::new(ctx.assistant_name(), text, Utc::now()),
            );
        }
        Ok(Err(e)) => {
            error!(chat = %chat_id, error = %e, "Failed to send reply");
        }
        Err(_) => {
            error!(
                chat = %chat_id,
                timeout = ?settings.call_timeout,
                "Send timed out"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ember_core::{
        AI_SERVICE, AiCapability, Attachment, EventKind, SEND_SERVICE, SendCapability, SendError,
    };
    use ember_framework::{CommandReply, RuntimeSettings};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingSender {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingSender {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().clone()
        }
    }

    #[async_trait]
    impl SendCapability for RecordingSender {
        async fn send(
            &self,
            chat_id: &str,
            text: &str,
            _attachments: &[String],
        ) -> Result<(), SendError> {
            self.sent.lock().push((chat_id.to_string(), text.to_string()));
            Ok(())
        }
    }

    struct RecordingAi {
        prompts: Mutex<Vec<(String, usize)>>,
        fail: bool,
    }

    impl RecordingAi {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    #[async_trait]
    impl AiCapability for RecordingAi {
        async fn reply(
            &self,
            prompt: &str,
            history: &[HistoryEntry],
            _attachments: &[Attachment],
        ) -> Result<String, AiError> {
            self.prompts.lock().push((prompt.to_string(), history.len()));
            if self.fail {
                Err(AiError::Provider("unavailable".into()))
            } else {
                Ok(format!("reply to: {prompt}"))
            }
        }
    }

    fn settings() -> PipelineSettings {
        PipelineSettings {
            message_prefix: String::new(),
            ignore_older_than: Duration::from_secs(3600),
            call_timeout: Duration::from_secs(5),
        }
    }

    fn context_with_sender() -> (Arc<RuntimeContext>, Arc<RecordingSender>) {
        let ctx = Arc::new(RuntimeContext::new(RuntimeSettings::default()));
        let sender = RecordingSender::new();
        let capability: Arc<dyn SendCapability> = sender.clone();
        ctx.services()
            .register(SEND_SERVICE, "transport", capability)
            .unwrap();
        (ctx, sender)
    }

    fn inbound(text: &str) -> ChatMessage {
        ChatMessage::new("chat-1", "alice", text, Utc::now())
    }

    #[tokio::test]
    async fn command_reply_reaches_the_chat_and_history() {
        let (ctx, sender) = context_with_sender();
        ctx.commands()
            .register_command(
                "echo",
                "ping",
                "Pong!",
                Arc::new(|_| Box::pin(async { Ok(CommandReply::text("Pong!")) })),
            )
            .unwrap();

        handle_message(&ctx, &settings(), inbound("!ph#ping")).await;

        assert_eq!(sender.sent(), vec![("chat-1".to_string(), "Pong!".to_string())]);
        let history = ctx.history().history_snapshot("chat-1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].sender, "Assistant");
        assert_eq!(history[1].text, "Pong!");
    }

    #[tokio::test]
    async fn unknown_command_gets_an_explicit_reply() {
        let (ctx, sender) = context_with_sender();

        handle_message(&ctx, &settings(), inbound("!ph#nope")).await;

        assert_eq!(
            sender.sent(),
            vec![("chat-1".to_string(), "Unknown command: nope".to_string())]
        );
    }

    #[tokio::test]
    async fn failing_command_handler_is_silent_to_the_chat() {
        let (ctx, sender) = context_with_sender();
        ctx.commands()
            .register_command(
                "echo",
                "broken",
                "Always fails",
                Arc::new(|_| Box::pin(async { Err("boom".into()) })),
            )
            .unwrap();

        handle_message(&ctx, &settings(), inbound("!ph#broken")).await;
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn slow_command_handler_is_cut_off_and_silent() {
        let (ctx, sender) = context_with_sender();
        ctx.commands()
            .register_command(
                "echo",
                "slow",
                "Sleeps forever",
                Arc::new(|_| {
                    Box::pin(async {
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                        Ok(CommandReply::text("too late"))
                    })
                }),
            )
            .unwrap();

        let settings = PipelineSettings {
            call_timeout: Duration::from_millis(20),
            ..settings()
        };
        handle_message(&ctx, &settings, inbound("!ph#slow")).await;
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn quote_is_folded_into_the_command_argument() {
        let (ctx, _sender) = context_with_sender();
        let seen = Arc::new(Mutex::new(None));
        let seen_in_handler = Arc::clone(&seen);
        ctx.commands()
            .register_command(
                "echo",
                "echo",
                "Echoes the argument",
                Arc::new(move |inv: CommandInvocation| {
                    let seen = Arc::clone(&seen_in_handler);
                    Box::pin(async move {
                        *seen.lock() = inv.argument.clone();
                        Ok(CommandReply::text(""))
                    })
                }),
            )
            .unwrap();

        let msg = inbound("!ph#echo keep this").with_quote("quoted line");
        handle_message(&ctx, &settings(), msg).await;
        assert_eq!(seen.lock().as_deref(), Some("keep this\n\nquoted line"));
    }

    #[tokio::test]
    async fn plain_message_is_republished_for_passthrough_plugins() {
        let (ctx, sender) = context_with_sender();
        let plain_count = Arc::new(AtomicUsize::new(0));
        let message_count = Arc::new(AtomicUsize::new(0));
        {
            let plain_count = Arc::clone(&plain_count);
            ctx.bus().subscribe(
                "observer",
                EventKind::PlainMessage,
                Arc::new(move |_| {
                    let plain_count = Arc::clone(&plain_count);
                    Box::pin(async move {
                        plain_count.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    })
                }),
            );
        }
        {
            let message_count = Arc::clone(&message_count);
            ctx.bus().subscribe(
                "observer",
                EventKind::Message,
                Arc::new(move |_| {
                    let message_count = Arc::clone(&message_count);
                    Box::pin(async move {
                        message_count.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    })
                }),
            );
        }

        handle_message(&ctx, &settings(), inbound("just chatting")).await;

        assert_eq!(message_count.load(Ordering::SeqCst), 1);
        assert_eq!(plain_count.load(Ordering::SeqCst), 1);
        // Plain traffic produces no reply by itself.
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn triggered_message_is_not_republished_as_plain() {
        let (ctx, _sender) = context_with_sender();
        let plain_count = Arc::new(AtomicUsize::new(0));
        let plain_in_handler = Arc::clone(&plain_count);
        ctx.bus().subscribe(
            "observer",
            EventKind::PlainMessage,
            Arc::new(move |_| {
                let plain_count = Arc::clone(&plain_in_handler);
                Box::pin(async move {
                    plain_count.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            }),
        );

        handle_message(&ctx, &settings(), inbound("!ph#nope")).await;
        assert_eq!(plain_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn ai_prompt_flows_through_the_provider() {
        let (ctx, sender) = context_with_sender();
        let ai = RecordingAi::new(false);
        let capability: Arc<dyn AiCapability> = ai.clone();
        ctx.services()
            .register(AI_SERVICE, "provider", capability)
            .unwrap();

        handle_message(&ctx, &settings(), inbound("!ph how are you")).await;

        let prompts = ai.prompts.lock().clone();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].0, "how are you");
        // The just-recorded inbound message is part of the window.
        assert_eq!(prompts[0].1, 1);
        assert_eq!(
            sender.sent(),
            vec![("chat-1".to_string(), "reply to: how are you".to_string())]
        );
    }

    #[tokio::test]
    async fn ai_failure_produces_the_fallback_reply() {
        let (ctx, sender) = context_with_sender();
        let ai = RecordingAi::new(true);
        let capability: Arc<dyn AiCapability> = ai.clone();
        ctx.services()
            .register(AI_SERVICE, "provider", capability)
            .unwrap();

        handle_message(&ctx, &settings(), inbound("!ph hello")).await;
        assert_eq!(
            sender.sent(),
            vec![("chat-1".to_string(), FALLBACK_REPLY.to_string())]
        );
    }

    #[tokio::test]
    async fn missing_ai_capability_degrades_to_silence() {
        let (ctx, sender) = context_with_sender();
        handle_message(&ctx, &settings(), inbound("!ph hello")).await;
        assert!(sender.sent().is_empty());
        // The message was still recorded and observable.
        assert_eq!(ctx.history().history_snapshot("chat-1").len(), 1);
    }

    #[tokio::test]
    async fn empty_prompt_asks_for_one() {
        let (ctx, sender) = context_with_sender();
        handle_message(&ctx, &settings(), inbound("!ph")).await;
        assert_eq!(
            sender.sent(),
            vec![("chat-1".to_string(), EMPTY_PROMPT_REPLY.to_string())]
        );
    }

    #[tokio::test]
    async fn quoted_text_alone_becomes_the_prompt() {
        let (ctx, _sender) = context_with_sender();
        let ai = RecordingAi::new(false);
        let capability: Arc<dyn AiCapability> = ai.clone();
        ctx.services()
            .register(AI_SERVICE, "provider", capability)
            .unwrap();

        let msg = inbound("!ph").with_quote("what was said before");
        handle_message(&ctx, &settings(), msg).await;

        let prompts = ai.prompts.lock().clone();
        assert_eq!(prompts[0].0, "what was said before");
    }

    #[tokio::test]
    async fn old_messages_are_dropped_before_any_dispatch() {
        let (ctx, sender) = context_with_sender();
        let msg = ChatMessage::new(
            "chat-1",
            "alice",
            "!ph#ping",
            Utc::now() - chrono::Duration::hours(2),
        );

        handle_message(&ctx, &settings(), msg).await;

        assert!(sender.sent().is_empty());
        assert!(ctx.history().history_snapshot("chat-1").is_empty());
    }

    #[tokio::test]
    async fn message_prefix_is_prepended_to_replies() {
        let (ctx, sender) = context_with_sender();
        let settings = PipelineSettings {
            message_prefix: "[bot] ".to_string(),
            ..settings()
        };

        handle_message(&ctx, &settings, inbound("!ph#nope")).await;
        assert_eq!(sender.sent()[0].1, "[bot] Unknown command: nope");
    }
}
