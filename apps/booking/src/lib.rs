//! Booking core for Buzke business profiles: the Remote Business API client,
//! the visitor session, voucher pricing and the step-by-step booking wizard.

pub mod api;
pub mod error;
pub mod models;
pub mod pricing;
pub mod session;
pub mod wizard;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, ApiConfig, BusinessApi};
pub use error::{ApiError, ApiResult, StepError};
pub use session::{MemorySessionStore, Session, SessionStore};
pub use wizard::{BookingWizard, StepKind, StepOutcome};
