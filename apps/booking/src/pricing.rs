//! Final price of a booking: slot base price minus at most one voucher.

use crate::models::{DiscountKind, Voucher};

/// Amount the voucher takes off `base`. A voucher without a usable amount
/// discounts nothing.
pub fn discount(base: f64, voucher: &Voucher) -> f64 {
    match voucher.discount {
        DiscountKind::Percentage => voucher
            .percentage
            .map(|pct| base * (pct / 100.0))
            .unwrap_or(0.0),
        DiscountKind::FixedValue => voucher.value.unwrap_or(0.0),
    }
}

/// `max(0, base - discount)`, rounded to cents.
pub fn total_price(base: f64, voucher: Option<&Voucher>) -> f64 {
    let price = match voucher {
        Some(v) => base - discount(base, v),
        None => base,
    };
    round_cents(price.max(0.0))
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `R$ 90.00`
pub fn format_brl(value: f64) -> String {
    format!("R$ {:.2}", value)
}
