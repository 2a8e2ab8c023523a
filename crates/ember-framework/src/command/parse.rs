//! Pure text-routing logic for inbound messages.
//!
//! Policy (fixed, relied on by tests):
//!
//! - Trigger words match **case-insensitively** (ASCII) at the start of the
//!   trimmed message; the longest configured trigger wins, so `!pothead`
//!   is never shadowed by `!pot`.
//! - The remainder after the trigger is trimmed. If it starts with the
//!   command marker, everything up to the first space is the command part;
//!   the command part splits on commas into a **case-sensitive** name plus
//!   parameters, and the rest of the text is the free-form argument.
//! - A trigger without the marker makes the whole remainder an AI-bound
//!   prompt.
//! - No trigger at all routes the message as plain passthrough text.

/// Routing decision for one inbound message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Marker right after a trigger word: a named command.
    Command {
        /// Command name (first comma-separated token, case-sensitive).
        name: String,
        /// Remaining comma-separated tokens before the first space.
        params: Vec<String>,
        /// Free-form text after the first space, if any.
        argument: Option<String>,
    },
    /// Trigger word without the marker: the remainder is an AI prompt
    /// (possibly empty).
    AiPrompt(String),
    /// No trigger word: passthrough text for non-command plugins.
    Plain,
}

/// Returns the remainder after the longest matching trigger word, or `None`
/// when the text starts with no trigger.
///
/// `triggers` must already be sorted longest-first.
fn strip_trigger<'a>(text: &'a str, triggers: &[String]) -> Option<&'a str> {
    for trigger in triggers {
        if let Some(prefix) = text.get(..trigger.len())
            && prefix.eq_ignore_ascii_case(trigger)
        {
            return Some(&text[trigger.len()..]);
        }
    }
    None
}

/// Splits command content (text after the marker) into name, params, and
/// argument.
fn split_command(content: &str) -> (String, Vec<String>, Option<String>) {
    let (command_part, argument) = match content.split_once(' ') {
        Some((cmd, rest)) => {
            let rest = rest.trim();
            (cmd, (!rest.is_empty()).then(|| rest.to_string()))
        }
        None => (content, None),
    };

    let mut tokens = command_part.split(',').map(str::trim);
    let name = tokens.next().unwrap_or_default().to_string();
    let params: Vec<String> = tokens.map(str::to_string).collect();
    (name, params, argument)
}

/// Routes `text` against the configured trigger words and marker.
pub(crate) fn route_text(text: &str, triggers: &[String], marker: char) -> Route {
    let clean = text.trim();
    let Some(remainder) = strip_trigger(clean, triggers) else {
        return Route::Plain;
    };

    let content = remainder.trim();
    match content.strip_prefix(marker) {
        Some(command_content) => {
            let (name, params, argument) = split_command(command_content);
            Route::Command {
                name,
                params,
                argument,
            }
        }
        None => Route::AiPrompt(content.to_string()),
    }
}
