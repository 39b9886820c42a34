//! Invoice arithmetic: line totals and the subtotal/tax/total roll-up.
//!
//! Every screen that shows money derived from line items goes through
//! [`compute`], so the preview, the list and the save payload never disagree.

use crate::models::InvoiceItem;

/// Differences at or below this are treated as equal when deciding whether
/// recomputed totals need to be written back.
pub const TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
}

impl Totals {
    pub fn differs(&self, other: &Totals) -> bool {
        (self.subtotal - other.subtotal).abs() > TOLERANCE
            || (self.tax - other.tax).abs() > TOLERANCE
            || (self.total - other.total).abs() > TOLERANCE
    }
}

pub fn line_total(quantity: f64, unit_price: f64) -> f64 {
    quantity * unit_price
}

/// Roll up line items. `tax_rate` is a percentage (11.0 means 11%).
pub fn compute<I>(items: I, tax_rate: f64) -> Totals
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let subtotal: f64 = items
        .into_iter()
        .map(|(quantity, unit_price)| line_total(quantity, unit_price))
        .sum();
    let tax = subtotal * (tax_rate / 100.0);
    Totals {
        subtotal,
        tax,
        total: subtotal + tax,
    }
}

/// Roll up saved invoice items.
pub fn compute_items(items: &[InvoiceItem], tax_rate: f64) -> Totals {
    compute(items.iter().map(|i| (i.quantity, i.unit_price)), tax_rate)
}

/// Lenient numeric parse for form input: blank or garbage counts as zero.
pub fn parse_amount(raw: &str) -> f64 {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}
