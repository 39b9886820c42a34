use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::cli::{confirm, Context, InvoiceArgs};
use crate::error::{PennyError, Result};
use crate::fmt::{display_date, file_component, money};
use crate::invoice_form::{HeaderField, InvoiceForm, ItemDraft};
use crate::listing::{filter_invoices, StatusFilter};
use crate::models::{InvoiceStatus, User};
use crate::preview::PreviewData;
use crate::settings::shellexpand_path;

/// `DESCRIPTION:QTY:UNIT_PRICE`. The description may itself contain colons.
pub fn parse_item(raw: &str) -> Result<ItemDraft> {
    let mut parts = raw.rsplitn(3, ':');
    let (Some(price), Some(qty), Some(desc)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(PennyError::Other(format!(
            "Invalid item '{raw}': expected DESCRIPTION:QTY:UNIT_PRICE"
        )));
    };
    for (label, value) in [("quantity", qty), ("unit price", price)] {
        if value.trim().replace(',', "").parse::<f64>().is_err() {
            return Err(PennyError::Other(format!("Invalid {label} '{value}' in item '{raw}'")));
        }
    }
    Ok(ItemDraft {
        id: None,
        description: desc.trim().to_string(),
        quantity: qty.trim().to_string(),
        unit_price: price.trim().to_string(),
    })
}

/// Apply command-line overrides to a form. Explicit contact fields detach
/// the form from a picked client, same as typing into them on screen.
pub fn apply_args(form: &mut InvoiceForm, args: InvoiceArgs) -> Result<()> {
    let overrides = [
        (HeaderField::InvoiceNumber, args.number),
        (HeaderField::IssueDate, args.issue_date),
        (HeaderField::DueDate, args.due_date),
        (HeaderField::ClientName, args.client_name),
        (HeaderField::ClientEmail, args.client_email),
        (HeaderField::ClientAddress, args.client_address),
        (HeaderField::ClientPhone, args.client_phone),
        (HeaderField::TaxRate, args.tax_rate.map(|v| v.to_string())),
        (HeaderField::Notes, args.notes),
    ];
    for (field, value) in overrides {
        if let Some(v) = value {
            form.set(field, v);
        }
    }
    if !args.items.is_empty() {
        form.items = args
            .items
            .iter()
            .map(|raw| parse_item(raw))
            .collect::<Result<Vec<_>>>()?;
        form.recompute();
    }
    Ok(())
}

fn ensure_valid(form: &InvoiceForm) -> Result<()> {
    let errors = form.validation_errors();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(PennyError::Validation(errors))
    }
}

fn status_cell(status: InvoiceStatus) -> String {
    let label = status.label();
    match status {
        InvoiceStatus::Draft => label.dimmed().to_string(),
        InvoiceStatus::Sent => label.blue().to_string(),
        InvoiceStatus::Paid => label.green().to_string(),
        InvoiceStatus::Overdue => label.red().to_string(),
    }
}

pub fn list(ctx: &Context, search: Option<&str>, status: &str) -> Result<()> {
    let filter: StatusFilter = status.parse().map_err(PennyError::Other)?;
    ctx.require_login()?;
    let invoices = ctx.api.list_invoices()?;
    let shown = filter_invoices(&invoices, search.unwrap_or(""), filter);
    if shown.is_empty() {
        println!("No invoices found.");
        return Ok(());
    }

    let currency = &ctx.settings.currency;
    let mut table = Table::new();
    table.set_header(vec!["ID", "Number", "Client", "Due", "Status", "Total"]);
    for inv in shown {
        table.add_row(vec![
            Cell::new(inv.id),
            Cell::new(&inv.invoice_number),
            Cell::new(&inv.client_name),
            Cell::new(display_date(&inv.due_date)),
            Cell::new(status_cell(inv.status)),
            Cell::new(money(currency, inv.total)).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("Invoices\n{table}");
    Ok(())
}

fn sender(ctx: &Context) -> Option<User> {
    ctx.api
        .me()
        .map_err(|e| tracing::warn!(error = %e, "could not load sender profile"))
        .ok()
}

pub fn show(ctx: &Context, id: i64) -> Result<()> {
    ctx.require_login()?;
    let invoice = ctx.api.get_invoice(id)?;
    let me = sender(ctx);
    let preview = PreviewData::from_invoice(&invoice, me.as_ref());
    println!("{}", preview.to_text(&ctx.settings.currency, 80));
    Ok(())
}

pub fn create(ctx: &Context, args: InvoiceArgs) -> Result<()> {
    ctx.require_login()?;
    let mut form = InvoiceForm::blank_now(ctx.settings.due_in_days, ctx.settings.default_tax_rate);
    if let Some(client_id) = args.client_id {
        let client = ctx.api.get_client(client_id)?;
        form.select_client(&client);
    }
    apply_args(&mut form, args)?;
    ensure_valid(&form)?;
    ctx.api.create_invoice(&form.draft_request())?;
    println!(
        "Created draft {} for {} ({})",
        form.invoice_number,
        form.client_name,
        money(&ctx.settings.currency, form.totals().total)
    );
    Ok(())
}

pub fn update(ctx: &Context, id: i64, args: InvoiceArgs) -> Result<()> {
    ctx.require_login()?;
    let invoice = ctx.api.get_invoice(id)?;
    let mut form = InvoiceForm::from_invoice(&invoice);
    if let Some(client_id) = args.client_id {
        let client = ctx.api.get_client(client_id)?;
        form.select_client(&client);
    }
    apply_args(&mut form, args)?;
    ensure_valid(&form)?;
    ctx.api.update_invoice(id, &form.draft_request())?;
    println!(
        "Updated {} ({})",
        form.invoice_number,
        money(&ctx.settings.currency, form.totals().total)
    );
    Ok(())
}

pub fn delete(ctx: &Context, id: i64, yes: bool) -> Result<()> {
    ctx.require_login()?;
    let invoice = ctx.api.get_invoice(id)?;
    if !yes && !confirm(&format!("Delete invoice {}?", invoice.invoice_number))? {
        println!("Cancelled.");
        return Ok(());
    }
    ctx.api.delete_invoice(id)?;
    println!("Deleted invoice {}", invoice.invoice_number);
    Ok(())
}

pub fn pdf_file_name(invoice_number: &str) -> String {
    format!("invoice-{}.pdf", file_component(invoice_number))
}

pub fn download(ctx: &Context, id: i64, output: Option<String>) -> Result<()> {
    ctx.require_login()?;
    let path = match output {
        Some(p) => PathBuf::from(shellexpand_path(&p)),
        None => {
            let invoice = ctx.api.get_invoice(id)?;
            PathBuf::from(shellexpand_path(&ctx.settings.download_dir))
                .join(pdf_file_name(&invoice.invoice_number))
        }
    };
    let bytes = ctx.api.download_invoice(id)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, bytes)?;
    println!("Saved {}", path.display());
    Ok(())
}

pub fn send(ctx: &Context, id: i64) -> Result<()> {
    ctx.require_login()?;
    ctx.api.send_invoice_email(id)?;
    println!("Invoice sent successfully");
    Ok(())
}

pub fn mark(ctx: &Context, id: i64, status: &str) -> Result<()> {
    let status: InvoiceStatus = status.parse().map_err(PennyError::Other)?;
    ctx.require_login()?;
    ctx.api.set_invoice_status(id, status)?;
    println!("Invoice {id} marked as {}", status.label());
    Ok(())
}

pub fn summary(ctx: &Context) -> Result<()> {
    ctx.require_login()?;
    let summary = ctx.api.invoice_summary()?;
    let currency = &ctx.settings.currency;
    println!("Total revenue:  {}", money(currency, summary.total_revenue));
    println!("Paid:           {}", money(currency, summary.paid).green());
    println!(
        "Pending:        {}",
        money(currency, summary.total_revenue - summary.paid).yellow()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn blank() -> InvoiceForm {
        InvoiceForm::new_blank(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(), 1, 30, 0.0)
    }

    #[test]
    fn item_description_may_contain_colons() {
        let item = parse_item("Retainer: October:1:2,500,000").unwrap();
        assert_eq!(item.description, "Retainer: October");
        assert_eq!(item.quantity, "1");
        assert_eq!(item.unit_price_value(), 2_500_000.0);
    }

    #[test]
    fn malformed_items_are_rejected() {
        assert!(parse_item("Design").is_err());
        assert!(parse_item("Design:two:100").is_err());
    }

    #[test]
    fn args_replace_items_and_recompute() {
        let mut form = blank();
        let args = InvoiceArgs {
            client_name: Some("Acme".into()),
            tax_rate: Some(10.0),
            items: vec!["Design:2:100".into(), "Hosting:1:50".into()],
            ..InvoiceArgs::default()
        };
        apply_args(&mut form, args).unwrap();
        assert_eq!(form.items.len(), 2);
        assert_eq!(form.client_name, "Acme");
        assert_eq!(form.totals().subtotal, 250.0);
        assert_eq!(form.totals().total, 275.0);
    }

    #[test]
    fn contact_override_detaches_picked_client() {
        let mut form = blank();
        form.client_id = Some(7);
        let args = InvoiceArgs {
            client_email: Some("new@acme.test".into()),
            ..InvoiceArgs::default()
        };
        apply_args(&mut form, args).unwrap();
        assert_eq!(form.client_id, None);
    }

    #[test]
    fn incomplete_form_fails_validation() {
        let err = ensure_valid(&blank()).unwrap_err();
        assert!(matches!(err, PennyError::Validation(ref e) if !e.is_empty()));
    }

    #[test]
    fn pdf_name_uses_invoice_number() {
        assert_eq!(pdf_file_name("INV-2026-001"), "invoice-INV-2026-001.pdf");
    }

    #[test]
    fn server_numbers_cannot_leave_the_download_folder() {
        let name = pdf_file_name("../../.ssh/authorized_keys");
        assert_eq!(name, "invoice-ssh-authorized_keys.pdf");
        assert!(!name.contains('/'));
    }
}
