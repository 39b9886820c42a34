//! One-shot invoice generation without an account. The document is read from
//! a JSON file, checked locally, then rendered by the public PDF endpoint.

use std::path::Path;

use chrono::{DateTime, Datelike, Local, NaiveDate};
use serde::Deserialize;

use crate::error::Result;
use crate::fmt::{file_component, iso_date};
use crate::models::{InvoiceItem, Party, PublicInvoiceRequest};
use crate::totals::{self, Totals};
use crate::validate::Checker;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublicItem {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub unit_price: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublicInvoiceForm {
    #[serde(default)]
    pub invoice_number: String,
    #[serde(default)]
    pub issue_date: String,
    #[serde(default)]
    pub due_date: String,
    #[serde(default)]
    pub tax_rate: f64,
    #[serde(default)]
    pub notes: String,
    pub sender: Party,
    pub recipient: Party,
    #[serde(default)]
    pub items: Vec<PublicItem>,
}

/// `INV-<year>-<last six digits of the millisecond clock>`.
pub fn default_number(now: DateTime<Local>) -> String {
    let millis = now.timestamp_millis().rem_euclid(1_000_000);
    format!("INV-{}-{millis:06}", now.year())
}

/// Lowercase with dashes between words. Path separators and dots never
/// survive, so the result is always one file name component.
pub fn kebab(name: &str) -> String {
    file_component(name).to_lowercase()
}

impl PublicInvoiceForm {
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Fill the invoice number and dates the way a fresh form starts out.
    pub fn apply_defaults(&mut self, now: DateTime<Local>, due_in_days: i64) {
        let today = now.date_naive();
        if self.invoice_number.trim().is_empty() {
            self.invoice_number = default_number(now);
        }
        if self.issue_date.trim().is_empty() {
            self.issue_date = today.format("%Y-%m-%d").to_string();
        }
        if self.due_date.trim().is_empty() {
            let due = today + chrono::Duration::days(due_in_days);
            self.due_date = due.format("%Y-%m-%d").to_string();
        }
    }

    pub fn validate(&self) -> Result<()> {
        let mut c = Checker::new();
        c.required("sender_name", &self.sender.name, "Sender name is required")
            .required("sender_email", &self.sender.email, "Sender email is required")
            .email("sender_email", &self.sender.email, "Invalid sender email")
            .required("sender_address", &self.sender.address, "Sender address is required")
            .required("sender_phone", &self.sender.phone, "Sender phone is required")
            .required("sender_bank_name", &self.sender.bank_name, "Bank name is required")
            .required("sender_bank_account_name", &self.sender.bank_account_name, "Account name is required")
            .required(
                "sender_bank_account_number",
                &self.sender.bank_account_number,
                "Account number is required",
            )
            .required("client_name", &self.recipient.name, "Client name is required")
            .required("client_email", &self.recipient.email, "Client email is required")
            .email("client_email", &self.recipient.email, "Invalid client email")
            .required("client_address", &self.recipient.address, "Client address is required")
            .required("client_phone", &self.recipient.phone, "Client phone is required")
            .required("invoice_number", &self.invoice_number, "Invoice number is required")
            .check(
                "issue_date",
                NaiveDate::parse_from_str(self.issue_date.trim(), "%Y-%m-%d").is_ok(),
                "Issue date must be YYYY-MM-DD",
            )
            .check(
                "due_date",
                NaiveDate::parse_from_str(self.due_date.trim(), "%Y-%m-%d").is_ok(),
                "Due date must be YYYY-MM-DD",
            )
            .check("tax_rate", self.tax_rate >= 0.0, "Tax rate cannot be negative")
            .check("items", !self.items.is_empty(), "At least one item is required");
        for item in &self.items {
            c.required("item_description", &item.description, "Item description is required")
                .check("item_quantity", item.quantity > 0.0, "Quantity must be greater than 0")
                .check("item_unit_price", item.unit_price > 0.0, "Unit price must be greater than 0");
        }
        c.finish()
    }

    pub fn totals(&self) -> Totals {
        totals::compute(self.items.iter().map(|i| (i.quantity, i.unit_price)), self.tax_rate)
    }

    pub fn to_request(&self) -> PublicInvoiceRequest {
        let trim_party = |p: &Party| Party {
            name: p.name.trim().to_string(),
            address: p.address.trim().to_string(),
            email: p.email.trim().to_string(),
            phone: p.phone.trim().to_string(),
            bank_name: p.bank_name.trim().to_string(),
            bank_account_name: p.bank_account_name.trim().to_string(),
            bank_account_number: p.bank_account_number.trim().to_string(),
        };
        PublicInvoiceRequest {
            invoice_number: self.invoice_number.trim().to_string(),
            issue_date: iso_date(&self.issue_date),
            due_date: iso_date(&self.due_date),
            notes: self.notes.clone(),
            sender: trim_party(&self.sender),
            recipient: trim_party(&self.recipient),
            items: self
                .items
                .iter()
                .map(|i| InvoiceItem {
                    id: None,
                    description: i.description.trim().to_string(),
                    quantity: i.quantity,
                    unit_price: i.unit_price,
                    total: totals::line_total(i.quantity, i.unit_price),
                })
                .collect(),
            tax_rate: self.tax_rate,
        }
    }

    pub fn file_name(&self) -> String {
        format!(
            "invoice-{}-{}.pdf",
            kebab(&self.recipient.name),
            file_component(self.issue_date.trim())
        )
    }
}
