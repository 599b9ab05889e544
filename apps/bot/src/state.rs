use std::sync::Arc;
use std::time::{Duration, Instant};

use buzke_booking::models::{Company, Service};
use buzke_booking::{ApiResult, BookingWizard, BusinessApi, MemorySessionStore, Session, SessionStore};
use chrono::{Datelike, FixedOffset, NaiveDate, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::callbacks::Input;
use crate::rate_limit::RateLimiter;

/// A chat untouched for this long loses its flow; the session token stays
/// in the store and is restored on the next update.
pub const CHAT_IDLE: Duration = Duration::from_secs(2 * 60 * 60);

/// Shared by every handler.
pub struct BotState {
    pub api: Arc<dyn BusinessApi>,
    pub limiter: RateLimiter,
    pub business_username: String,
    pub utc_offset: FixedOffset,
    store: Arc<MemorySessionStore>,
    chats: DashMap<i64, ChatEntry>,
}

struct ChatEntry {
    flow: Arc<Mutex<ChatFlow>>,
    last_seen: Instant,
}

impl BotState {
    pub fn new(api: Arc<dyn BusinessApi>, business_username: String, utc_offset: FixedOffset) -> Self {
        Self {
            api,
            limiter: RateLimiter::new(),
            business_username,
            utc_offset,
            store: Arc::new(MemorySessionStore::new()),
            chats: DashMap::new(),
        }
    }

    /// Today at the business.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.utc_offset).date_naive()
    }

    /// The flow of `chat_id`, created on first contact. Handlers take the
    /// lock with `try_lock` so a chat runs one update at a time.
    pub fn chat(&self, chat_id: i64) -> Arc<Mutex<ChatFlow>> {
        let now = Instant::now();
        self.chats
            .entry(chat_id)
            .and_modify(|entry| entry.last_seen = now)
            .or_insert_with(|| {
                let store: Arc<dyn SessionStore> = self.store.clone();
                let session = Session::restore(store, chat_id.to_string());
                ChatEntry {
                    flow: Arc::new(Mutex::new(ChatFlow::new(session, self.today()))),
                    last_seen: now,
                }
            })
            .flow
            .clone()
    }

    /// Drops flows idle for longer than `CHAT_IDLE`. Returns how many went.
    pub fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now())
    }

    fn evict_idle_at(&self, now: Instant) -> usize {
        let before = self.chats.len();
        self.chats.retain(|_, entry| {
            // a handler still holds it
            Arc::strong_count(&entry.flow) > 1
                || now.saturating_duration_since(entry.last_seen) < CHAT_IDLE
        });
        before.saturating_sub(self.chats.len())
    }

    pub fn active_chats(&self) -> usize {
        self.chats.len()
    }

    pub fn stored_sessions(&self) -> usize {
        self.store.len()
    }
}

/// Everything one chat is doing: its session, the catalog it browsed and
/// the open booking, if any.
pub struct ChatFlow {
    pub session: Session,
    pub company: Option<Company>,
    pub catalog_date: NaiveDate,
    pub services: Vec<Service>,
    pub wizard: Option<BookingWizard>,
    /// First day of the month the calendar shows.
    pub calendar_month: NaiveDate,
    /// Field the next text message fills in.
    pub input: Option<Input>,
}

impl ChatFlow {
    pub fn new(session: Session, today: NaiveDate) -> Self {
        Self {
            session,
            company: None,
            catalog_date: today,
            services: Vec::new(),
            wizard: None,
            calendar_month: first_of_month(today),
            input: None,
        }
    }

    /// The business profile, fetched once per chat.
    pub async fn company(&mut self, api: &dyn BusinessApi, username: &str) -> ApiResult<Company> {
        if let Some(company) = &self.company {
            return Ok(company.clone());
        }
        let company = api.business(username).await?;
        tracing::debug!(company_id = company.id, "business profile loaded");
        self.company = Some(company.clone());
        Ok(company)
    }

    pub fn service(&self, id: i64) -> Option<&Service> {
        self.services.iter().find(|s| s.id == id)
    }

    pub fn open_wizard(&mut self, service: Service, today: NaiveDate, utc_offset: FixedOffset) {
        self.wizard = Some(BookingWizard::open(service, &self.session, utc_offset));
        self.calendar_month = first_of_month(today);
        self.input = None;
    }

    pub fn close_wizard(&mut self) {
        self.wizard = None;
        self.input = None;
    }
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}
