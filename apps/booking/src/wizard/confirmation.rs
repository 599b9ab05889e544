//! Step 4: recurrence, at-home address and voucher before confirming.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone};

use crate::error::StepError;
use crate::models::{Flag, TimeSlot, Voucher};
use crate::pricing;

/// How long a fixed (recurring) booking repeats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecurrenceDuration {
    #[default]
    ThreeMonths,
    SixMonths,
    NineMonths,
    Unlimited,
}

impl RecurrenceDuration {
    pub const ALL: [Self; 4] = [
        Self::ThreeMonths,
        Self::SixMonths,
        Self::NineMonths,
        Self::Unlimited,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Self::ThreeMonths => "3M",
            Self::SixMonths => "6M",
            Self::NineMonths => "9M",
            Self::Unlimited => "12M",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::ThreeMonths => "3 Meses",
            Self::SixMonths => "6 Meses",
            Self::NineMonths => "9 Meses",
            Self::Unlimited => "Ilimitado",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.code() == code)
    }

    pub fn is_unlimited(self) -> bool {
        self == Self::Unlimited
    }
}

/// Text for the slot's `fixed_type`.
pub fn recurrence_label(fixed_type: &str) -> &'static str {
    if fixed_type == "weekly" {
        "Semanalmente (mesmo dia da semana)"
    } else {
        "Mensalmente (mesmo dia do mês)"
    }
}

/// `date` at the slot's `HH:MM` in the business time zone.
pub fn appointment_time(
    date: NaiveDate,
    time: &str,
    offset: FixedOffset,
) -> Option<DateTime<FixedOffset>> {
    let (hours, minutes) = time.split_once(':')?;
    let minutes = minutes.get(..2).unwrap_or(minutes);
    let time = NaiveTime::from_hms_opt(hours.trim().parse().ok()?, minutes.parse().ok()?, 0)?;
    offset.from_local_datetime(&date.and_time(time)).single()
}

#[derive(Debug, Clone, Default)]
pub struct ConfirmationForm {
    pub recurring: bool,
    pub duration: RecurrenceDuration,
    pub at_home: bool,
    pub address: String,
    pub voucher_code: String,
    voucher: Option<Voucher>,
    voucher_message: Option<String>,
    voucher_error: Option<String>,
}

impl ConfirmationForm {
    /// Fresh form for `slot`; an at-home-only slot starts with at-home on.
    pub fn for_slot(slot: &TimeSlot) -> Self {
        Self {
            at_home: slot.only_at_home,
            ..Self::default()
        }
    }

    /// Re-targets the form at another slot. The applied voucher survives.
    pub fn fit_to(&mut self, slot: &TimeSlot) {
        self.recurring = self.recurring && slot.enable_fixed_scheduling;
        self.at_home = slot.only_at_home || (self.at_home && slot.at_home);
    }

    pub fn set_recurring(&mut self, slot: &TimeSlot, on: bool) -> Result<(), StepError> {
        if !slot.enable_fixed_scheduling {
            return Err(StepError::WrongStep);
        }
        self.recurring = on;
        Ok(())
    }

    pub fn set_duration(&mut self, duration: RecurrenceDuration) {
        self.duration = duration;
    }

    /// `only_at_home` keeps the flag on whatever is asked.
    pub fn set_at_home(&mut self, slot: &TimeSlot, on: bool) -> Result<(), StepError> {
        if !slot.at_home && !slot.only_at_home {
            return Err(StepError::WrongStep);
        }
        self.at_home = on || slot.only_at_home;
        Ok(())
    }

    pub fn set_address(&mut self, address: &str) {
        self.address = address.trim().to_string();
    }

    pub fn voucher(&self) -> Option<&Voucher> {
        self.voucher.as_ref()
    }

    pub fn voucher_message(&self) -> Option<&str> {
        self.voucher_message.as_deref()
    }

    pub fn voucher_error(&self) -> Option<&str> {
        self.voucher_error.as_deref()
    }

    pub fn apply_voucher(&mut self, voucher: Voucher) {
        self.voucher_message = Some(
            voucher
                .description
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| "Cupom aplicado!".to_string()),
        );
        self.voucher_error = None;
        self.voucher = Some(voucher);
    }

    pub fn reject_voucher(&mut self, message: impl Into<String>) {
        self.voucher_message = None;
        self.voucher_error = Some(message.into());
    }

    pub fn total_price(&self, slot: &TimeSlot) -> f64 {
        pricing::total_price(slot.default_value, self.voucher.as_ref())
    }

    pub fn validate(&self) -> Result<(), StepError> {
        if self.at_home && self.address.is_empty() {
            return Err(StepError::AddressRequired);
        }
        Ok(())
    }

    pub fn address_field(&self) -> Option<String> {
        self.at_home.then(|| self.address.clone())
    }

    /// `ilimitado`/`limite` pair; both absent unless the booking recurs.
    pub fn recurrence_fields(&self) -> (Option<Flag>, Option<String>) {
        if !self.recurring {
            return (None, None);
        }
        if self.duration.is_unlimited() {
            (Some(Flag::Yes), None)
        } else {
            (Some(Flag::No), Some(self.duration.code().to_string()))
        }
    }

    pub fn voucher_ids(&self) -> Option<Vec<i64>> {
        self.voucher.as_ref().map(|v| vec![v.id])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DiscountKind;
    use serde_json::json;

    fn slot(extra: serde_json::Value) -> TimeSlot {
        let mut value = json!({ "time": "14:30", "default_value": "100.00" });
        if let (Some(base), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        serde_json::from_value(value).unwrap()
    }

    fn voucher(description: Option<&str>) -> Voucher {
        Voucher {
            id: 8,
            code: "PROMO10".into(),
            discount: DiscountKind::Percentage,
            value: None,
            percentage: Some(10.0),
            valid_from: None,
            valid_until: None,
            description: description.map(str::to_string),
            usage_limit: None,
            active: true,
        }
    }

    // ── Recurrence ──

    #[test]
    fn test_duration_codes() {
        assert_eq!(RecurrenceDuration::default().code(), "3M");
        assert_eq!(RecurrenceDuration::from_code("12M"), Some(RecurrenceDuration::Unlimited));
        assert_eq!(RecurrenceDuration::Unlimited.label(), "Ilimitado");
        assert_eq!(RecurrenceDuration::from_code("1M"), None);
    }

    #[test]
    fn test_recurrence_fields() {
        let mut form = ConfirmationForm::default();
        assert_eq!(form.recurrence_fields(), (None, None));

        form.recurring = true;
        form.set_duration(RecurrenceDuration::SixMonths);
        assert_eq!(form.recurrence_fields(), (Some(Flag::No), Some("6M".into())));

        form.set_duration(RecurrenceDuration::Unlimited);
        assert_eq!(form.recurrence_fields(), (Some(Flag::Yes), None));
    }

    #[test]
    fn test_recurring_needs_fixed_scheduling() {
        let mut form = ConfirmationForm::default();
        assert_eq!(
            form.set_recurring(&slot(json!({})), true),
            Err(StepError::WrongStep)
        );
        form.set_recurring(&slot(json!({ "enable_fixed_scheduling": true })), true)
            .unwrap();
        assert!(form.recurring);
    }

    #[test]
    fn test_recurrence_label() {
        assert_eq!(recurrence_label("weekly"), "Semanalmente (mesmo dia da semana)");
        assert_eq!(recurrence_label("monthly"), "Mensalmente (mesmo dia do mês)");
    }

    // ── At home ──

    #[test]
    fn test_only_at_home_forces_flag() {
        let s = slot(json!({ "at_home": true, "only_at_home": true }));
        let mut form = ConfirmationForm::for_slot(&s);
        assert!(form.at_home);
        form.set_at_home(&s, false).unwrap();
        assert!(form.at_home);
        assert_eq!(form.validate(), Err(StepError::AddressRequired));

        form.set_address("  Rua A, 10 ");
        assert!(form.validate().is_ok());
        assert_eq!(form.address_field().as_deref(), Some("Rua A, 10"));
    }

    #[test]
    fn test_address_omitted_when_not_at_home() {
        let s = slot(json!({ "at_home": true }));
        let mut form = ConfirmationForm::for_slot(&s);
        form.set_address("Rua A");
        assert_eq!(form.address_field(), None);
        assert!(form.set_at_home(&slot(json!({})), true).is_err());
    }

    #[test]
    fn test_fit_to_other_slot_keeps_voucher() {
        let home = slot(json!({ "at_home": true, "enable_fixed_scheduling": true }));
        let mut form = ConfirmationForm::for_slot(&home);
        form.set_at_home(&home, true).unwrap();
        form.set_recurring(&home, true).unwrap();
        form.apply_voucher(voucher(None));

        form.fit_to(&slot(json!({})));
        assert!(!form.at_home);
        assert!(!form.recurring);
        assert!(form.voucher().is_some());
    }

    // ── Voucher ──

    #[test]
    fn test_voucher_messages() {
        let mut form = ConfirmationForm::default();
        form.reject_voucher("Cupom inválido");
        assert_eq!(form.voucher_error(), Some("Cupom inválido"));

        form.apply_voucher(voucher(None));
        assert_eq!(form.voucher_message(), Some("Cupom aplicado!"));
        assert_eq!(form.voucher_error(), None);
        assert_eq!(form.voucher_ids(), Some(vec![8]));

        form.apply_voucher(voucher(Some("10% na primeira visita")));
        assert_eq!(form.voucher_message(), Some("10% na primeira visita"));
    }

    #[test]
    fn test_total_price_with_voucher() {
        let s = slot(json!({}));
        let mut form = ConfirmationForm::default();
        assert_eq!(form.total_price(&s), 100.0);
        form.apply_voucher(voucher(None));
        assert_eq!(form.total_price(&s), 90.0);
    }

    // ── Timestamp ──

    #[test]
    fn test_appointment_time_uses_business_offset() {
        let offset = FixedOffset::west_opt(3 * 3600).unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();
        let at = appointment_time(date, "14:30", offset).unwrap();
        assert_eq!(at.to_rfc3339(), "2026-10-20T14:30:00-03:00");
        assert_eq!(
            appointment_time(date, "09:05:00", offset).unwrap().to_rfc3339(),
            "2026-10-20T09:05:00-03:00"
        );
    }

    #[test]
    fn test_appointment_time_rejects_garbage() {
        let offset = FixedOffset::east_opt(0).unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();
        assert!(appointment_time(date, "25:00", offset).is_none());
        assert!(appointment_time(date, "noon", offset).is_none());
    }
}
