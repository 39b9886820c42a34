//! Editable invoice state behind the create/edit screen.
//!
//! Text fields are kept as typed so partially entered numbers survive
//! editing; totals are re-derived on every change and the live preview is
//! refreshed through [`PreviewDebounce`].

use std::time::{Duration, Instant};

use chrono::{Duration as Days, NaiveDate};

use crate::fmt::{iso_date, parse_date};
use crate::models::{Client, Invoice, InvoiceInput, InvoiceItem, InvoiceStatus, User};
use crate::preview::PreviewData;
use crate::totals::{self, parse_amount, Totals};
use crate::validate::FieldError;

pub const PREVIEW_DEBOUNCE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderField {
    InvoiceNumber,
    IssueDate,
    DueDate,
    ClientName,
    ClientEmail,
    ClientAddress,
    ClientPhone,
    TaxRate,
    Notes,
}

impl HeaderField {
    pub const ALL: [HeaderField; 9] = [
        HeaderField::InvoiceNumber,
        HeaderField::IssueDate,
        HeaderField::DueDate,
        HeaderField::ClientName,
        HeaderField::ClientEmail,
        HeaderField::ClientAddress,
        HeaderField::ClientPhone,
        HeaderField::TaxRate,
        HeaderField::Notes,
    ];

    pub fn label(self) -> &'static str {
        match self {
            HeaderField::InvoiceNumber => "Invoice #",
            HeaderField::IssueDate => "Issue Date",
            HeaderField::DueDate => "Due Date",
            HeaderField::ClientName => "Client",
            HeaderField::ClientEmail => "Client Email",
            HeaderField::ClientAddress => "Client Address",
            HeaderField::ClientPhone => "Client Phone",
            HeaderField::TaxRate => "Tax Rate %",
            HeaderField::Notes => "Notes",
        }
    }

    fn is_client_contact(self) -> bool {
        matches!(
            self,
            HeaderField::ClientName
                | HeaderField::ClientEmail
                | HeaderField::ClientAddress
                | HeaderField::ClientPhone
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    Description,
    Quantity,
    UnitPrice,
}

impl ItemField {
    pub const ALL: [ItemField; 3] = [ItemField::Description, ItemField::Quantity, ItemField::UnitPrice];

    pub fn label(self) -> &'static str {
        match self {
            ItemField::Description => "Description",
            ItemField::Quantity => "Qty",
            ItemField::UnitPrice => "Unit Price",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemDraft {
    pub id: Option<i64>,
    pub description: String,
    pub quantity: String,
    pub unit_price: String,
}

impl Default for ItemDraft {
    fn default() -> Self {
        Self {
            id: None,
            description: String::new(),
            quantity: "1".to_string(),
            unit_price: "0".to_string(),
        }
    }
}

impl ItemDraft {
    pub fn quantity_value(&self) -> f64 {
        parse_amount(&self.quantity)
    }

    pub fn unit_price_value(&self) -> f64 {
        parse_amount(&self.unit_price)
    }

    pub fn total(&self) -> f64 {
        totals::line_total(self.quantity_value(), self.unit_price_value())
    }

    pub fn get(&self, field: ItemField) -> &str {
        match field {
            ItemField::Description => &self.description,
            ItemField::Quantity => &self.quantity,
            ItemField::UnitPrice => &self.unit_price,
        }
    }

    fn slot(&mut self, field: ItemField) -> &mut String {
        match field {
            ItemField::Description => &mut self.description,
            ItemField::Quantity => &mut self.quantity,
            ItemField::UnitPrice => &mut self.unit_price,
        }
    }
}

/// Restartable quiet-period timer: the preview refreshes once edits have
/// stopped for `delay`.
#[derive(Debug, Clone)]
pub struct PreviewDebounce {
    delay: Duration,
    pending_since: Option<Instant>,
}

impl Default for PreviewDebounce {
    fn default() -> Self {
        Self::new(PREVIEW_DEBOUNCE)
    }
}

impl PreviewDebounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending_since: None,
        }
    }

    pub fn touch(&mut self, now: Instant) {
        self.pending_since = Some(now);
    }

    pub fn is_pending(&self) -> bool {
        self.pending_since.is_some()
    }

    pub fn due(&self, now: Instant) -> bool {
        self.pending_since
            .is_some_and(|since| now.saturating_duration_since(since) >= self.delay)
    }

    /// Time left before a pending refresh fires. Used as the event poll timeout.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.pending_since
            .map(|since| self.delay.saturating_sub(now.saturating_duration_since(since)))
    }

    pub fn settle(&mut self) {
        self.pending_since = None;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceForm {
    pub invoice_number: String,
    pub issue_date: String,
    pub due_date: String,
    pub client_id: Option<i64>,
    pub client_name: String,
    pub client_email: String,
    pub client_address: String,
    pub client_phone: String,
    pub tax_rate: String,
    pub notes: String,
    pub status: InvoiceStatus,
    pub items: Vec<ItemDraft>,
    totals: Totals,
}

impl InvoiceForm {
    /// A fresh draft: numbered from the clock, issued today, due after
    /// `due_in_days`, with one empty line.
    pub fn new_blank(today: NaiveDate, stamp_millis: i64, due_in_days: i64, tax_rate: f64) -> Self {
        let due = today + Days::days(due_in_days);
        let mut form = Self {
            invoice_number: format!("INV-{stamp_millis}"),
            issue_date: today.format("%Y-%m-%d").to_string(),
            due_date: due.format("%Y-%m-%d").to_string(),
            client_id: None,
            client_name: String::new(),
            client_email: String::new(),
            client_address: String::new(),
            client_phone: String::new(),
            tax_rate: tax_rate.to_string(),
            notes: String::new(),
            status: InvoiceStatus::Draft,
            items: vec![ItemDraft::default()],
            totals: Totals::default(),
        };
        form.recompute();
        form
    }

    pub fn blank_now(due_in_days: i64, tax_rate: f64) -> Self {
        let now = chrono::Local::now();
        Self::new_blank(now.date_naive(), now.timestamp_millis(), due_in_days, tax_rate)
    }

    /// Edit-mode copy of a saved invoice. Numbers are copied at full
    /// precision so saving without edits sends back what the server stored.
    pub fn from_invoice(invoice: &Invoice) -> Self {
        let mut form = Self {
            invoice_number: invoice.invoice_number.clone(),
            issue_date: invoice.issue_date.as_deref().map(iso_date).unwrap_or_default(),
            due_date: iso_date(&invoice.due_date),
            client_id: invoice.client_id,
            client_name: invoice.client_name.clone(),
            client_email: invoice.client_email.clone().unwrap_or_default(),
            client_address: invoice.client_address.clone().unwrap_or_default(),
            client_phone: invoice.client_phone.clone().unwrap_or_default(),
            tax_rate: invoice.tax_rate.to_string(),
            notes: invoice.notes.clone().unwrap_or_default(),
            status: invoice.status,
            items: invoice
                .items
                .iter()
                .map(|i| ItemDraft {
                    id: i.id,
                    description: i.description.clone(),
                    quantity: i.quantity.to_string(),
                    unit_price: i.unit_price.to_string(),
                })
                .collect(),
            totals: Totals::default(),
        };
        form.recompute();
        form
    }

    pub fn totals(&self) -> Totals {
        self.totals
    }

    pub fn tax_rate_value(&self) -> f64 {
        parse_amount(&self.tax_rate)
    }

    /// Re-derive totals from the items. Returns true when the stored totals
    /// moved by more than the tolerance.
    pub fn recompute(&mut self) -> bool {
        let fresh = totals::compute(
            self.items
                .iter()
                .map(|i| (i.quantity_value(), i.unit_price_value())),
            self.tax_rate_value(),
        );
        if fresh.differs(&self.totals) {
            self.totals = fresh;
            true
        } else {
            false
        }
    }

    pub fn get(&self, field: HeaderField) -> &str {
        match field {
            HeaderField::InvoiceNumber => &self.invoice_number,
            HeaderField::IssueDate => &self.issue_date,
            HeaderField::DueDate => &self.due_date,
            HeaderField::ClientName => &self.client_name,
            HeaderField::ClientEmail => &self.client_email,
            HeaderField::ClientAddress => &self.client_address,
            HeaderField::ClientPhone => &self.client_phone,
            HeaderField::TaxRate => &self.tax_rate,
            HeaderField::Notes => &self.notes,
        }
    }

    fn slot(&mut self, field: HeaderField) -> &mut String {
        match field {
            HeaderField::InvoiceNumber => &mut self.invoice_number,
            HeaderField::IssueDate => &mut self.issue_date,
            HeaderField::DueDate => &mut self.due_date,
            HeaderField::ClientName => &mut self.client_name,
            HeaderField::ClientEmail => &mut self.client_email,
            HeaderField::ClientAddress => &mut self.client_address,
            HeaderField::ClientPhone => &mut self.client_phone,
            HeaderField::TaxRate => &mut self.tax_rate,
            HeaderField::Notes => &mut self.notes,
        }
    }

    /// Replace a header field. Typing over a client contact field detaches
    /// the invoice from the saved client it was picked from.
    pub fn set(&mut self, field: HeaderField, value: impl Into<String>) {
        *self.slot(field) = value.into();
        if field.is_client_contact() {
            self.client_id = None;
        }
        if field == HeaderField::TaxRate {
            self.recompute();
        }
    }

    pub fn push_char(&mut self, field: HeaderField, c: char) {
        let mut value = self.get(field).to_string();
        value.push(c);
        self.set(field, value);
    }

    pub fn pop_char(&mut self, field: HeaderField) {
        let mut value = self.get(field).to_string();
        if value.pop().is_some() {
            self.set(field, value);
        }
    }

    pub fn select_client(&mut self, client: &Client) {
        self.client_id = Some(client.id);
        self.client_name = client.name.clone();
        self.client_email = client.email.clone().unwrap_or_default();
        self.client_address = client.address.clone().unwrap_or_default();
        self.client_phone = client.phone.clone().unwrap_or_default();
    }

    pub fn set_item(&mut self, index: usize, field: ItemField, value: impl Into<String>) {
        if let Some(item) = self.items.get_mut(index) {
            *item.slot(field) = value.into();
            self.recompute();
        }
    }

    pub fn push_item_char(&mut self, index: usize, field: ItemField, c: char) {
        if let Some(item) = self.items.get(index) {
            let mut value = item.get(field).to_string();
            value.push(c);
            self.set_item(index, field, value);
        }
    }

    pub fn pop_item_char(&mut self, index: usize, field: ItemField) {
        if let Some(item) = self.items.get(index) {
            let mut value = item.get(field).to_string();
            if value.pop().is_some() {
                self.set_item(index, field, value);
            }
        }
    }

    pub fn add_item(&mut self) -> usize {
        self.items.push(ItemDraft::default());
        self.recompute();
        self.items.len() - 1
    }

    /// Remove a line. The last remaining line is kept so the form always has
    /// somewhere to type.
    pub fn remove_item(&mut self, index: usize) -> bool {
        if self.items.len() <= 1 || index >= self.items.len() {
            return false;
        }
        self.items.remove(index);
        self.recompute();
        true
    }

    pub fn validation_errors(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.invoice_number.trim().is_empty() {
            errors.push(FieldError::new("invoice_number", "Invoice number is required"));
        }
        for (field, value, label) in [
            ("issue_date", &self.issue_date, "Issue date"),
            ("due_date", &self.due_date, "Due date"),
        ] {
            if value.trim().is_empty() {
                errors.push(FieldError::new(field, format!("{label} is required")));
            } else if parse_date(value).is_none() {
                errors.push(FieldError::new(field, format!("{label} must be YYYY-MM-DD")));
            }
        }
        if self.items.is_empty() {
            errors.push(FieldError::new("items", "At least one item is required"));
        }
        for (i, item) in self.items.iter().enumerate() {
            let n = i + 1;
            if item.description.trim().is_empty() {
                errors.push(FieldError::new("items", format!("Item {n}: description is required")));
            }
            if item.quantity_value() <= 0.0 {
                errors.push(FieldError::new("items", format!("Item {n}: quantity must be positive")));
            }
            if item.unit_price_value() < 0.0 {
                errors.push(FieldError::new("items", format!("Item {n}: unit price cannot be negative")));
            }
        }
        // A picked client carries its own contact details server-side.
        if self.client_id.is_none() {
            for (field, value, message) in [
                ("client_name", &self.client_name, "Client name is required"),
                ("client_email", &self.client_email, "Client email is required"),
                ("client_address", &self.client_address, "Client address is required"),
                ("client_phone", &self.client_phone, "Client phone is required"),
            ] {
                if value.trim().is_empty() {
                    errors.push(FieldError::new(field, message));
                }
            }
        }
        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validation_errors().is_empty()
    }

    pub fn missing_fields_message(&self) -> &'static str {
        if self.client_id.is_some() {
            "Please fill in all required fields (invoice number, dates, and items)"
        } else {
            "Please fill in all required fields (invoice number, dates, client details, and items)"
        }
    }

    /// Saving from the editor always files the invoice back as a draft,
    /// whether it is new or already sent.
    pub fn draft_request(&self) -> InvoiceInput {
        self.to_request(InvoiceStatus::Draft)
    }

    pub fn to_request(&self, status: InvoiceStatus) -> InvoiceInput {
        let items = self
            .items
            .iter()
            .map(|i| InvoiceItem {
                id: i.id,
                description: i.description.trim().to_string(),
                quantity: i.quantity_value(),
                unit_price: i.unit_price_value(),
                total: i.total(),
            })
            .collect();
        InvoiceInput {
            client_id: self.client_id,
            client_name: self.client_name.trim().to_string(),
            client_email: self.client_email.trim().to_string(),
            client_address: self.client_address.trim().to_string(),
            client_phone: self.client_phone.trim().to_string(),
            invoice_number: self.invoice_number.trim().to_string(),
            issue_date: iso_date(&self.issue_date),
            due_date: iso_date(&self.due_date),
            tax_rate: self.tax_rate_value(),
            notes: self.notes.clone(),
            status,
            items,
            subtotal: self.totals.subtotal,
            tax: self.totals.tax,
            total: self.totals.total,
        }
    }

    pub fn preview(&self, sender: Option<&User>) -> PreviewData {
        PreviewData::from_form(self, sender)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn blank() -> InvoiceForm {
        InvoiceForm::new_blank(today(), 1_792_368_000_000, 30, 0.0)
    }

    fn filled() -> InvoiceForm {
        let mut f = blank();
        f.set(HeaderField::ClientName, "Acme");
        f.set(HeaderField::ClientEmail, "ap@acme.test");
        f.set(HeaderField::ClientAddress, "Jl. Merdeka 1");
        f.set(HeaderField::ClientPhone, "0811111111");
        f.set_item(0, ItemField::Description, "Design");
        f.set_item(0, ItemField::Quantity, "2");
        f.set_item(0, ItemField::UnitPrice, "150");
        f
    }

    #[test]
    fn blank_form_defaults() {
        let f = blank();
        assert_eq!(f.invoice_number, "INV-1792368000000");
        assert_eq!(f.issue_date, "2026-10-19");
        assert_eq!(f.due_date, "2026-11-18");
        assert_eq!(f.status, InvoiceStatus::Draft);
        assert_eq!(f.items.len(), 1);
        assert_eq!(f.items[0].quantity, "1");
        assert_eq!(f.totals(), Totals::default());
        assert!(!f.is_valid());
    }

    #[test]
    fn item_edits_recompute_totals() {
        let mut f = filled();
        assert_eq!(f.totals().subtotal, 300.0);
        f.set(HeaderField::TaxRate, "10");
        assert_eq!(f.totals().tax, 30.0);
        assert_eq!(f.totals().total, 330.0);
        let idx = f.add_item();
        f.set_item(idx, ItemField::Quantity, "1");
        f.set_item(idx, ItemField::UnitPrice, "100");
        assert_eq!(f.totals().subtotal, 400.0);
        assert_eq!(f.totals().total, 440.0);
        assert!(f.remove_item(idx));
        assert_eq!(f.totals().total, 330.0);
    }

    #[test]
    fn typing_digits_one_by_one_tracks_totals() {
        let mut f = filled();
        f.set_item(0, ItemField::UnitPrice, "");
        assert_eq!(f.totals().subtotal, 0.0);
        for c in "12.5".chars() {
            f.push_item_char(0, ItemField::UnitPrice, c);
        }
        assert_eq!(f.totals().subtotal, 25.0);
        f.pop_item_char(0, ItemField::UnitPrice);
        assert_eq!(f.totals().subtotal, 24.0);
    }

    #[test]
    fn last_item_cannot_be_removed() {
        let mut f = blank();
        assert!(!f.remove_item(0));
        assert_eq!(f.items.len(), 1);
    }

    #[test]
    fn manual_client_requires_all_contact_fields() {
        let mut f = filled();
        assert!(f.is_valid());
        f.set(HeaderField::ClientPhone, "");
        assert!(!f.is_valid());
        assert!(f.missing_fields_message().contains("client details"));
    }

    #[test]
    fn picked_client_only_needs_the_id() {
        let mut f = blank();
        f.set_item(0, ItemField::Description, "Retainer");
        f.set_item(0, ItemField::UnitPrice, "500");
        f.select_client(&Client {
            id: 4,
            name: "Globex".into(),
            email: None,
            phone: None,
            address: None,
        });
        assert_eq!(f.client_id, Some(4));
        assert!(f.is_valid());
        assert!(!f.missing_fields_message().contains("client details"));
    }

    #[test]
    fn editing_contact_detaches_client() {
        let mut f = blank();
        f.select_client(&Client {
            id: 4,
            name: "Globex".into(),
            ..Client::default()
        });
        f.push_char(HeaderField::ClientName, 's');
        assert_eq!(f.client_id, None);
        assert_eq!(f.client_name, "Globexs");
        // non-contact fields leave the selection alone
        f.select_client(&Client { id: 5, name: "Initech".into(), ..Client::default() });
        f.set(HeaderField::Notes, "Thanks!");
        assert_eq!(f.client_id, Some(5));
    }

    #[test]
    fn item_rules() {
        let mut f = filled();
        f.set_item(0, ItemField::Quantity, "0");
        assert!(!f.is_valid());
        f.set_item(0, ItemField::Quantity, "1");
        f.set_item(0, ItemField::UnitPrice, "-5");
        assert!(!f.is_valid());
        f.set_item(0, ItemField::UnitPrice, "0");
        assert!(f.is_valid());
    }

    #[test]
    fn bad_dates_are_rejected() {
        let mut f = filled();
        f.set(HeaderField::DueDate, "next week");
        let errors = f.validation_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Due date must be YYYY-MM-DD");
    }

    #[test]
    fn request_carries_consistent_totals() {
        let mut f = filled();
        f.set(HeaderField::TaxRate, "11");
        let req = f.to_request(InvoiceStatus::Draft);
        assert_eq!(req.items[0].total, 300.0);
        assert_eq!(req.subtotal, 300.0);
        assert_eq!(req.tax, 33.0);
        assert_eq!(req.total, req.subtotal + req.tax);
        assert_eq!(req.issue_date, "2026-10-19");
        assert_eq!(req.client_id, None);
    }

    #[test]
    fn from_invoice_normalizes_dates() {
        let inv = Invoice {
            id: 9,
            client_id: Some(2),
            client_name: "Acme".into(),
            invoice_number: "INV-9".into(),
            issue_date: Some("2026-10-01T00:00:00Z".into()),
            due_date: "2026-10-31T00:00:00Z".into(),
            status: InvoiceStatus::Sent,
            tax_rate: 11.0,
            items: vec![InvoiceItem {
                id: Some(1),
                description: "Build".into(),
                quantity: 3.0,
                unit_price: 1000.0,
                total: 3000.0,
            }],
            ..Invoice::default()
        };
        let f = InvoiceForm::from_invoice(&inv);
        assert_eq!(f.issue_date, "2026-10-01");
        assert_eq!(f.due_date, "2026-10-31");
        assert_eq!(f.tax_rate, "11");
        assert_eq!(f.items[0].quantity, "3");
        assert_eq!(f.totals().total, 3330.0);
        assert_eq!(f.client_email, "");
    }

    fn precise_invoice() -> Invoice {
        Invoice {
            id: 12,
            client_name: "Acme".into(),
            client_email: Some("ap@acme.test".into()),
            client_address: Some("Jl. Merdeka 1".into()),
            client_phone: Some("0811111111".into()),
            invoice_number: "INV-12".into(),
            issue_date: Some("2026-10-01".into()),
            due_date: "2026-10-31".into(),
            status: InvoiceStatus::Paid,
            tax_rate: 7.125,
            subtotal: 125.0,
            items: vec![InvoiceItem {
                id: Some(3),
                description: "Stickers".into(),
                quantity: 1000.0,
                unit_price: 0.125,
                total: 125.0,
            }],
            ..Invoice::default()
        }
    }

    #[test]
    fn reopening_keeps_full_precision() {
        let f = InvoiceForm::from_invoice(&precise_invoice());
        assert_eq!(f.items[0].unit_price, "0.125");
        assert_eq!(f.tax_rate, "7.125");
        let req = f.draft_request();
        assert_eq!(req.items[0].unit_price, 0.125);
        assert_eq!(req.tax_rate, 7.125);
        assert_eq!(req.subtotal, 125.0);
        assert_eq!(req.items[0].total, 125.0);
    }

    #[test]
    fn saving_a_paid_invoice_files_it_as_draft() {
        let f = InvoiceForm::from_invoice(&precise_invoice());
        assert_eq!(f.status, InvoiceStatus::Paid);
        assert_eq!(f.draft_request().status, InvoiceStatus::Draft);
    }

    #[test]
    fn debounce_waits_for_quiet_period() {
        let start = Instant::now();
        let mut d = PreviewDebounce::default();
        assert!(!d.due(start));
        d.touch(start);
        assert!(!d.due(start + Duration::from_millis(50)));
        // another keystroke restarts the timer
        d.touch(start + Duration::from_millis(50));
        assert!(!d.due(start + Duration::from_millis(120)));
        assert_eq!(
            d.remaining(start + Duration::from_millis(120)),
            Some(Duration::from_millis(30))
        );
        assert!(d.due(start + Duration::from_millis(150)));
        d.settle();
        assert!(!d.is_pending());
        assert_eq!(d.remaining(start), None);
    }
}
