use std::path::{Path, PathBuf};

use crate::cli::Context;
use crate::error::Result;
use crate::fmt::money;
use crate::public_invoice::PublicInvoiceForm;
use crate::settings::shellexpand_path;

pub fn run(ctx: &Context, file: &str, output: Option<String>) -> Result<()> {
    let mut form = PublicInvoiceForm::from_path(Path::new(&shellexpand_path(file)))?;
    form.apply_defaults(chrono::Local::now(), ctx.settings.due_in_days);
    form.validate()?;

    let path = match output {
        Some(p) => PathBuf::from(shellexpand_path(&p)),
        None => PathBuf::from(shellexpand_path(&ctx.settings.download_dir)).join(form.file_name()),
    };

    let bytes = ctx.api.generate_public_invoice(&form.to_request())?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, bytes)?;
    println!(
        "Invoice {} generated ({}): {}",
        form.invoice_number,
        money(&ctx.settings.currency, form.totals().total),
        path.display()
    );
    Ok(())
}
