use crate::cli::Context;
use crate::error::Result;
use crate::fmt::money;
use crate::session::session_path;
use crate::settings::settings_path;

pub fn run(ctx: &Context) -> Result<()> {
    let s = &ctx.settings;
    println!("API:          {}", ctx.api.base_url());
    println!("Settings:     {}", settings_path().display());
    println!("Currency:     {}", s.currency);
    println!("Tax rate:     {}%", crate::fmt::quantity(s.default_tax_rate));
    println!("Due in:       {} days", s.due_in_days);
    println!("Downloads:    {}", s.download_dir);

    let Some(session) = ctx.api.session() else {
        println!();
        println!("Not logged in. Run `penny login` to sign in.");
        return Ok(());
    };

    println!("Session:      {}", session_path().display());
    match ctx.api.restore() {
        Ok(Some(user)) => {
            println!("User:         {} <{}>", user.name, user.email);
            match (ctx.api.list_clients(), ctx.api.list_invoices(), ctx.api.invoice_summary()) {
                (Ok(clients), Ok(invoices), Ok(summary)) => {
                    println!();
                    println!("Clients:        {}", clients.len());
                    println!("Invoices:       {}", invoices.len());
                    println!("Revenue:        {}", money(&s.currency, summary.total_revenue));
                    println!("Paid:           {}", money(&s.currency, summary.paid));
                }
                _ => println!("(could not load account statistics)"),
            }
        }
        Ok(None) => println!("User:         session for {} expired", session.email),
        Err(e) => println!("User:         {} (unreachable: {e})", session.email),
    }
    Ok(())
}
