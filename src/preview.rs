//! Invoice preview rendering, shared by the live editor pane, the invoice
//! viewer and `penny invoices show`.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::fmt::{display_date, money, quantity};
use crate::invoice_form::InvoiceForm;
use crate::models::{Invoice, InvoiceStatus, User};
use crate::totals::{self, Totals};
use crate::tui::{status_style, HEADER_STYLE};

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewLine {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreviewData {
    pub invoice_number: String,
    pub issue_date: String,
    pub due_date: String,
    pub status: Option<InvoiceStatus>,
    pub from: Vec<String>,
    pub to: Vec<String>,
    pub items: Vec<PreviewLine>,
    pub tax_rate: f64,
    pub totals: Totals,
    pub notes: String,
    pub bank: Vec<(String, String)>,
}

/// Keep only the non-blank entries, in order.
fn present(values: &[&str]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

fn sender_block(sender: Option<&User>) -> (Vec<String>, Vec<(String, String)>) {
    match sender {
        Some(u) => (
            present(&[u.name.as_str(), u.address.as_str(), u.email.as_str(), u.phone.as_str()]),
            bank_block(&u.bank_name, &u.bank_account_name, &u.bank_account_number),
        ),
        None => (Vec::new(), Vec::new()),
    }
}

pub fn bank_block(bank: &str, account_name: &str, account_number: &str) -> Vec<(String, String)> {
    [
        ("Bank", bank),
        ("Account Name", account_name),
        ("Account Number", account_number),
    ]
    .iter()
    .filter(|(_, v)| !v.trim().is_empty())
    .map(|(k, v)| (k.to_string(), v.trim().to_string()))
    .collect()
}

impl PreviewData {
    pub fn from_form(form: &InvoiceForm, sender: Option<&User>) -> Self {
        let (from, bank) = sender_block(sender);
        Self {
            invoice_number: form.invoice_number.clone(),
            issue_date: form.issue_date.clone(),
            due_date: form.due_date.clone(),
            status: Some(form.status),
            from,
            to: present(&[
                form.client_name.as_str(),
                form.client_address.as_str(),
                form.client_email.as_str(),
                form.client_phone.as_str(),
            ]),
            items: form
                .items
                .iter()
                .map(|i| PreviewLine {
                    description: i.description.clone(),
                    quantity: i.quantity_value(),
                    unit_price: i.unit_price_value(),
                    total: i.total(),
                })
                .collect(),
            tax_rate: form.tax_rate_value(),
            totals: form.totals(),
            notes: form.notes.clone(),
            bank,
        }
    }

    /// Saved invoices are re-totalled from their items so the preview never
    /// shows a stale server figure.
    pub fn from_invoice(invoice: &Invoice, sender: Option<&User>) -> Self {
        let (from, bank) = sender_block(sender);
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            invoice_number: invoice.invoice_number.clone(),
            issue_date: invoice.issue_date.clone().unwrap_or_default(),
            due_date: invoice.due_date.clone(),
            status: Some(invoice.status),
            from,
            to: present(&[
                invoice.client_name.as_str(),
                opt(&invoice.client_address).as_str(),
                opt(&invoice.client_email).as_str(),
                opt(&invoice.client_phone).as_str(),
            ]),
            items: invoice
                .items
                .iter()
                .map(|i| PreviewLine {
                    description: i.description.clone(),
                    quantity: i.quantity,
                    unit_price: i.unit_price,
                    total: totals::line_total(i.quantity, i.unit_price),
                })
                .collect(),
            tax_rate: invoice.tax_rate,
            totals: totals::compute_items(&invoice.items, invoice.tax_rate),
            notes: opt(&invoice.notes),
            bank,
        }
    }

    fn date_or_blank(raw: &str) -> String {
        if raw.trim().is_empty() {
            String::new()
        } else {
            display_date(raw)
        }
    }

    /// Styled lines for a ratatui pane of the given inner width.
    pub fn to_lines(&self, currency: &str, width: u16) -> Vec<Line<'static>> {
        let width = width.max(40) as usize;
        let dim = Style::default().fg(Color::DarkGray);
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let mut lines = Vec::new();

        let mut title = vec![Span::styled("INVOICE", HEADER_STYLE)];
        if let Some(status) = self.status {
            title.push(Span::raw("  "));
            title.push(Span::styled(format!("[{}]", status.label()), status_style(status)));
        }
        lines.push(Line::from(title));
        lines.push(Line::from(Span::styled(self.invoice_number.clone(), dim)));
        lines.push(Line::from(format!(
            "Issue Date: {}",
            Self::date_or_blank(&self.issue_date)
        )));
        lines.push(Line::from(format!(
            "Due Date:   {}",
            Self::date_or_blank(&self.due_date)
        )));
        lines.push(Line::from(""));

        lines.push(Line::from(Span::styled("FROM", dim)));
        for l in &self.from {
            lines.push(Line::from(l.clone()));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("TO", dim)));
        for l in &self.to {
            lines.push(Line::from(l.clone()));
        }
        lines.push(Line::from(""));

        let amount_w = 16;
        let qty_w = 6;
        let desc_w = width.saturating_sub(amount_w * 2 + qty_w + 3).max(10);
        lines.push(Line::from(Span::styled(
            format!(
                "{:<desc_w$} {:>qty_w$} {:>amount_w$} {:>amount_w$}",
                "Description", "Qty", "Unit Price", "Total"
            ),
            dim.add_modifier(Modifier::BOLD),
        )));
        for item in &self.items {
            let desc: String = item.description.chars().take(desc_w).collect();
            let qty = if item.quantity > 0.0 {
                quantity(item.quantity)
            } else {
                String::new()
            };
            lines.push(Line::from(format!(
                "{:<desc_w$} {:>qty_w$} {:>amount_w$} {:>amount_w$}",
                desc,
                qty,
                money(currency, item.unit_price),
                money(currency, item.total)
            )));
        }
        lines.push(Line::from(Span::styled("─".repeat(width.min(desc_w + qty_w + amount_w * 2 + 3)), dim)));

        let label_w = desc_w + qty_w + amount_w + 2;
        lines.push(Line::from(format!(
            "{:>label_w$} {:>amount_w$}",
            "Subtotal",
            money(currency, self.totals.subtotal)
        )));
        lines.push(Line::from(format!(
            "{:>label_w$} {:>amount_w$}",
            format!("Tax ({}%)", quantity(self.tax_rate)),
            money(currency, self.totals.tax)
        )));
        lines.push(Line::from(Span::styled(
            format!(
                "{:>label_w$} {:>amount_w$}",
                "Total",
                money(currency, self.totals.total)
            ),
            bold,
        )));

        if !self.notes.trim().is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled("NOTES", dim)));
            for l in textwrap::wrap(self.notes.trim(), width) {
                lines.push(Line::from(l.into_owned()));
            }
        }

        if !self.bank.is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled("PAYMENT DETAILS", dim)));
            for (k, v) in &self.bank {
                lines.push(Line::from(format!("{k}: {v}")));
            }
        }

        lines
    }

    /// Plain text for terminal output.
    pub fn to_text(&self, currency: &str, width: u16) -> String {
        self.to_lines(currency, width)
            .iter()
            .map(|l| {
                l.spans
                    .iter()
                    .map(|s| s.content.as_ref())
                    .collect::<String>()
                    .trim_end()
                    .to_string()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice_form::{HeaderField, ItemField};
    use crate::models::InvoiceItem;

    fn sender() -> User {
        User {
            id: 1,
            name: "Ana Putri".into(),
            email: "ana@studio.id".into(),
            address: "Jl. Kemang 5".into(),
            phone: "".into(),
            bank_name: "BCA".into(),
            bank_account_name: "Ana Putri".into(),
            bank_account_number: "".into(),
        }
    }

    #[test]
    fn blank_contact_lines_are_omitted() {
        let p = PreviewData::from_invoice(
            &Invoice {
                client_name: "Acme".into(),
                client_email: Some("".into()),
                client_phone: Some("0811".into()),
                ..Invoice::default()
            },
            Some(&sender()),
        );
        assert_eq!(p.from, vec!["Ana Putri", "Jl. Kemang 5", "ana@studio.id"]);
        assert_eq!(p.to, vec!["Acme", "0811"]);
        assert_eq!(p.bank.len(), 2);
    }

    #[test]
    fn saved_invoice_is_retotalled() {
        let inv = Invoice {
            tax_rate: 10.0,
            total: 999.0,
            items: vec![InvoiceItem {
                id: None,
                description: "Hosting".into(),
                quantity: 2.0,
                unit_price: 50.0,
                total: 0.0,
            }],
            ..Invoice::default()
        };
        let p = PreviewData::from_invoice(&inv, None);
        assert_eq!(p.items[0].total, 100.0);
        assert_eq!(p.totals.total, 110.0);
    }

    #[test]
    fn text_rendering_includes_totals_and_dates() {
        let mut form = InvoiceForm::new_blank(
            chrono::NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
            1,
            30,
            11.0,
        );
        form.set(HeaderField::ClientName, "Acme");
        form.set_item(0, ItemField::Description, "Logo design");
        form.set_item(0, ItemField::UnitPrice, "1000000");
        form.set(HeaderField::Notes, "Thank you for your business");
        let text = form.preview(Some(&sender())).to_text("IDR", 80);
        assert!(text.contains("INVOICE  [Draft]"));
        assert!(text.contains("Issue Date: 02 Jan 2026"));
        assert!(text.contains("Due Date:   01 Feb 2026"));
        assert!(text.contains("Logo design"));
        assert!(text.contains("IDR 1,000,000"));
        assert!(text.contains("Tax (11%)"));
        assert!(text.contains("IDR 1,110,000"));
        assert!(text.contains("Thank you for your business"));
        assert!(text.contains("Bank: BCA"));
    }

    #[test]
    fn zero_quantity_shows_blank() {
        let p = PreviewData {
            items: vec![PreviewLine {
                description: "Pending".into(),
                quantity: 0.0,
                unit_price: 10.0,
                total: 0.0,
            }],
            ..PreviewData::default()
        };
        let text = p.to_text("IDR", 60);
        let row = text.lines().find(|l| l.starts_with("Pending")).unwrap();
        assert!(!row.contains(" 0 "));
    }
}
