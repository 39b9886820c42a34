//! Client-side filtering and the dashboard roll-up over fetched records.

use std::cmp::Reverse;

use chrono::{DateTime, NaiveDateTime};

use crate::models::{Client, Invoice, InvoiceStatus, InvoiceSummary};

pub const RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(InvoiceStatus),
}

impl StatusFilter {
    pub fn matches(self, status: InvoiceStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(s) => s == status,
        }
    }

    /// All -> Draft -> Sent -> Paid -> Overdue -> All
    pub fn next(self) -> Self {
        match self {
            StatusFilter::All => StatusFilter::Only(InvoiceStatus::Draft),
            StatusFilter::Only(InvoiceStatus::Draft) => StatusFilter::Only(InvoiceStatus::Sent),
            StatusFilter::Only(InvoiceStatus::Sent) => StatusFilter::Only(InvoiceStatus::Paid),
            StatusFilter::Only(InvoiceStatus::Paid) => StatusFilter::Only(InvoiceStatus::Overdue),
            StatusFilter::Only(InvoiceStatus::Overdue) => StatusFilter::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusFilter::All => "All Status",
            StatusFilter::Only(s) => s.label(),
        }
    }
}

impl std::str::FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(StatusFilter::All)
        } else {
            s.parse().map(StatusFilter::Only)
        }
    }
}

pub fn filter_invoices<'a>(
    invoices: &'a [Invoice],
    search: &str,
    status: StatusFilter,
) -> Vec<&'a Invoice> {
    let needle = search.trim().to_lowercase();
    invoices
        .iter()
        .filter(|inv| {
            let matches_search = needle.is_empty()
                || inv.invoice_number.to_lowercase().contains(&needle)
                || inv.client_name.to_lowercase().contains(&needle);
            matches_search && status.matches(inv.status)
        })
        .collect()
}

pub fn filter_clients<'a>(clients: &'a [Client], search: &str) -> Vec<&'a Client> {
    let raw = search.trim();
    let needle = raw.to_lowercase();
    clients
        .iter()
        .filter(|c| {
            raw.is_empty()
                || c.name.to_lowercase().contains(&needle)
                || c
                    .email
                    .as_deref()
                    .is_some_and(|e| e.to_lowercase().contains(&needle))
                || c.phone.as_deref().is_some_and(|p| p.contains(raw))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DashboardStats {
    pub total_invoices: usize,
    pub total_revenue: f64,
    pub paid_invoices: usize,
    pub paid_amount: f64,
    pub pending_amount: f64,
    pub total_clients: usize,
}

pub fn dashboard_stats(invoices: &[Invoice], clients: &[Client], summary: InvoiceSummary) -> DashboardStats {
    DashboardStats {
        total_invoices: invoices.len(),
        total_revenue: summary.total_revenue,
        paid_invoices: invoices
            .iter()
            .filter(|i| i.status == InvoiceStatus::Paid)
            .count(),
        paid_amount: summary.paid,
        pending_amount: summary.total_revenue - summary.paid,
        total_clients: clients.len(),
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| crate::fmt::parse_date(raw).and_then(|d| d.and_hms_opt(0, 0, 0)))
}

/// Newest first, only invoices that carry a creation timestamp.
pub fn recent_invoices(invoices: &[Invoice]) -> Vec<&Invoice> {
    let mut dated: Vec<(NaiveDateTime, &Invoice)> = invoices
        .iter()
        .filter_map(|i| {
            i.created_at
                .as_deref()
                .and_then(parse_timestamp)
                .map(|ts| (ts, i))
        })
        .collect();
    dated.sort_by_key(|(ts, _)| Reverse(*ts));
    dated.into_iter().take(RECENT_LIMIT).map(|(_, i)| i).collect()
}
