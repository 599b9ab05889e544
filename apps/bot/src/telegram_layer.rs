//! Tracing layer that forwards ERROR events to the admin's Telegram chat.
//!
//! At most one message per `MIN_INTERVAL`; an identical message is not sent
//! again within `DEDUP_WINDOW`. Sending happens on a spawned task.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use teloxide::utils::html;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

const MIN_INTERVAL: Duration = Duration::from_secs(10);
const DEDUP_WINDOW: Duration = Duration::from_secs(60);

/// Rate limit plus dedup bookkeeping.
#[derive(Debug)]
struct Throttle {
    last_sent: Option<Instant>,
    recent: Vec<(u64, Instant)>,
}

impl Throttle {
    fn new() -> Self {
        Self {
            last_sent: None,
            recent: Vec::new(),
        }
    }

    /// Whether a message hashing to `hash` may go out at `now`; records it if so.
    fn admit(&mut self, hash: u64, now: Instant) -> bool {
        self.recent
            .retain(|(_, at)| now.saturating_duration_since(*at) < DEDUP_WINDOW);

        let duplicate = self.recent.iter().any(|(h, _)| *h == hash);
        let too_soon = self
            .last_sent
            .is_some_and(|last| now.saturating_duration_since(last) < MIN_INTERVAL);
        if duplicate || too_soon {
            return false;
        }

        self.last_sent = Some(now);
        self.recent.push((hash, now));
        true
    }
}

pub struct TelegramLayer {
    bot_token: String,
    chat_id: i64,
    http: reqwest::Client,
    throttle: Mutex<Throttle>,
}

impl TelegramLayer {
    pub fn new(bot_token: String, chat_id: i64) -> Self {
        Self {
            bot_token,
            chat_id,
            http: reqwest::Client::new(),
            throttle: Mutex::new(Throttle::new()),
        }
    }
}

fn hash_of(message: &str) -> u64 {
    let mut h = DefaultHasher::new();
    message.hash(&mut h);
    h.finish()
}

fn alert_text(message: &str, target: &str, file: &str, line: &str) -> String {
    let now_utc = chrono::Utc::now().format("%H:%M:%S UTC");
    format!(
        "\u{1f6a8} <b>Buzke bot error</b>\n\
         ━━━━━━━━━━━━━━━\n\
         <code>{}</code>\n\
         ━━━━━━━━━━━━━━━\n\
         \u{1f4cd} {target} ({file}:{line})\n\
         \u{1f550} {now_utc}",
        html::escape(message)
    )
}

impl<S: Subscriber> Layer<S> for TelegramLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::ERROR {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let message = visitor.message();

        let admitted = match self.throttle.lock() {
            Ok(mut throttle) => throttle.admit(hash_of(&message), Instant::now()),
            Err(_) => false,
        };
        if !admitted {
            return;
        }

        let meta = event.metadata();
        let line = meta.line().map_or_else(|| "?".to_string(), |l| l.to_string());
        let text = alert_text(&message, meta.target(), meta.file().unwrap_or("?"), &line);

        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let client = self.http.clone();
        let chat_id = self.chat_id;
        // no runtime during shutdown
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        runtime.spawn(async move {
            let _ = client
                .post(&url)
                .json(&serde_json::json!({
                    "chat_id": chat_id,
                    "text": text,
                    "parse_mode": "HTML"
                }))
                .send()
                .await;
        });
    }
}

// ── Field visitor ──

/// `message` plus the event's structured fields.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl MessageVisitor {
    fn message(&self) -> String {
        if self.fields.is_empty() {
            return self.message.clone();
        }
        let extras: Vec<String> = self
            .fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        if self.message.is_empty() {
            extras.join(", ")
        } else {
            format!("{} ({})", self.message, extras.join(", "))
        }
    }

    fn push(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.push((field.name().to_string(), value));
        }
    }
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.push(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, value.to_string());
    }
}
