//! Plain-text rendering of the views
//!
//! Everything here is a pure function of view state so the terminal front end
//! only has to print lines.

use ragchat_types::{Message, Role, ThreadId};

use crate::chat::{ChatView, HistoryState};
use crate::list::ConversationListView;
use crate::status::StatusView;

pub const WELCOME_TITLE: &str = "RAG Chat AI";
pub const WELCOME_SUBTITLE: &str = "Professional document retrieval and generation.";
pub const LOADING_HISTORY: &str = "Loading history...";
pub const THINKING: &str = "Thinking...";

const FULLNESS_BAR_WIDTH: usize = 20;

pub fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "You",
        Role::Assistant => "AI",
    }
}

/// One message, continuation lines indented under the label
pub fn render_message(message: &Message) -> Vec<String> {
    let label = role_label(message.role());
    let indent = " ".repeat(label.len() + 2);
    let mut lines = Vec::new();

    let mut content = message.content().lines();
    lines.push(format!("{}: {}", label, content.next().unwrap_or_default()));
    lines.extend(content.map(|line| format!("{}{}", indent, line)));

    let sources = message.sources();
    if !sources.is_empty() {
        lines.push(format!("{}Sources:", indent));
        lines.extend(sources.iter().map(|source| format!("{}  - {}", indent, source)));
    }
    lines
}

/// Transcript area of the chat view (welcome banner, loading, error or messages)
///
/// A failed history load is reported above the local messages, which stay
/// visible so messages sent afterwards are still shown.
pub fn render_transcript(chat: &ChatView) -> Vec<String> {
    if chat.is_welcome() {
        return vec![format!("{} — {}", WELCOME_TITLE, WELCOME_SUBTITLE)];
    }

    let mut lines = Vec::new();
    match chat.history() {
        HistoryState::Failed(message) => lines.push(message.clone()),
        HistoryState::Loading(_) if chat.messages().is_empty() => {
            return vec![LOADING_HISTORY.to_string()]
        }
        _ => {}
    }

    lines.extend(chat.messages().iter().flat_map(render_message));
    lines
}

/// Lines of `current` not yet printed, and whether the whole transcript changed
///
/// When `current` does not extend `previous` the transcript was replaced and
/// must be reprinted from the start.
pub fn transcript_delta<'a>(previous: &[String], current: &'a [String]) -> (bool, &'a [String]) {
    if current.len() >= previous.len() && current[..previous.len()] == *previous {
        (false, &current[previous.len()..])
    } else {
        (true, current)
    }
}

/// Sidebar conversation list
///
/// Rows are numbered from 1 so the front end can address them. A closed
/// sidebar only shows row numbers and the active marker.
pub fn render_conversation_list(
    list: &ConversationListView,
    active: Option<&ThreadId>,
    sidebar_open: bool,
) -> Vec<String> {
    let mut lines = vec![if sidebar_open { "History" } else { "•••" }.to_string()];

    if list.is_loading() {
        lines.push("  Loading conversations...".to_string());
        return lines;
    }
    if list.conversations().is_empty() {
        lines.push("  No conversations yet".to_string());
    }

    for (index, conversation) in list.conversations().iter().enumerate() {
        let marker = if active == Some(&conversation.thread_id) { "*" } else { " " };
        let number = index + 1;

        if !sidebar_open {
            lines.push(format!("{} {}", marker, number));
            continue;
        }

        match list.rename_draft() {
            Some(draft) if draft.thread_id == conversation.thread_id => {
                lines.push(format!("{} {}. [{}_]", marker, number, draft.title));
            }
            _ => lines.push(format!(
                "{} {}. {}",
                marker,
                number,
                conversation.display_title()
            )),
        }
    }

    if let Some(error) = list.error() {
        lines.push(format!("  Failed to refresh: {}", error));
    }
    lines
}

/// Backend status block
pub fn render_status(status: &StatusView, sidebar_open: bool) -> Vec<String> {
    if status.is_loading() {
        return vec!["Checking status...".to_string()];
    }

    let health = status.health();
    let api_up = health.map(|h| h.api_healthy()).unwrap_or(false);
    let db_up = health.map(|h| h.pinecone_connected).unwrap_or(false);
    let model_up = health.map(|h| h.gemini_connected).unwrap_or(false);

    if !sidebar_open {
        return vec![format!(
            "{} API {} DB {} AI",
            indicator(api_up),
            indicator(db_up),
            indicator(model_up)
        )];
    }

    let api = health.map(|h| h.status.as_str()).unwrap_or("Down");
    let mut lines = vec![
        format!("{} API: {}", indicator(api_up), api),
        format!(
            "{} Vector DB: {}",
            indicator(db_up),
            if db_up { "Connected" } else { "Error" }
        ),
        format!(
            "{} AI Model: {}",
            indicator(model_up),
            if model_up { "Ready" } else { "Error" }
        ),
    ];

    if let Some(stats) = status.stats() {
        let percent = stats.fullness_percent();
        lines.push(format!("Documents: {}", format_count(stats.total_vector_count)));
        lines.push(format!(
            "Index: {} {:.1}%",
            fullness_bar(percent, FULLNESS_BAR_WIDTH),
            percent
        ));
    }
    lines
}

fn indicator(up: bool) -> &'static str {
    if up {
        "●"
    } else {
        "○"
    }
}

/// `1234567` -> `1,234,567`
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Bar of `width` cells for a percentage, clamped to 0..=100
pub fn fullness_bar(percent: f64, width: usize) -> String {
    let percent = if percent.is_nan() { 0.0 } else { percent.clamp(0.0, 100.0) };
    let filled = ((percent / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}
