use zeroize::Zeroize;

use crate::cli::{confirm, Context};
use crate::error::Result;
use crate::models::{BankingUpdate, ProfileUpdate, User};
use crate::validate;

pub fn merge_profile(
    user: &User,
    name: Option<String>,
    email: Option<String>,
    address: Option<String>,
    phone: Option<String>,
) -> Result<ProfileUpdate> {
    let pick = |v: Option<String>, current: &str| v.unwrap_or_else(|| current.to_string()).trim().to_string();
    let update = ProfileUpdate {
        name: pick(name, &user.name),
        email: pick(email, &user.email),
        address: pick(address, &user.address),
        phone: pick(phone, &user.phone),
    };
    validate::profile(&update.name, &update.email, &update.address, &update.phone)?;
    Ok(update)
}

pub fn merge_banking(
    user: &User,
    bank_name: Option<String>,
    account_name: Option<String>,
    account_number: Option<String>,
) -> Result<BankingUpdate> {
    let pick = |v: Option<String>, current: &str| v.unwrap_or_else(|| current.to_string()).trim().to_string();
    let update = BankingUpdate {
        bank_name: pick(bank_name, &user.bank_name),
        bank_account_name: pick(account_name, &user.bank_account_name),
        bank_account_number: pick(account_number, &user.bank_account_number),
    };
    validate::banking(
        &update.bank_name,
        &update.bank_account_name,
        &update.bank_account_number,
    )?;
    Ok(update)
}

pub fn profile(
    ctx: &Context,
    name: Option<String>,
    email: Option<String>,
    address: Option<String>,
    phone: Option<String>,
) -> Result<()> {
    ctx.require_login()?;
    let user = ctx.api.me()?;
    let update = merge_profile(&user, name, email, address, phone)?;
    ctx.api.update_profile(&update)?;
    println!("Profile updated successfully");
    Ok(())
}

pub fn banking(
    ctx: &Context,
    bank_name: Option<String>,
    account_name: Option<String>,
    account_number: Option<String>,
) -> Result<()> {
    ctx.require_login()?;
    let user = ctx.api.me()?;
    let update = merge_banking(&user, bank_name, account_name, account_number)?;
    ctx.api.update_banking(&update)?;
    println!("Banking information updated successfully");
    Ok(())
}

pub fn password(ctx: &Context) -> Result<()> {
    ctx.require_login()?;
    let mut current = rpassword::prompt_password("Current password: ")?;
    let mut new = rpassword::prompt_password("New password: ")?;
    let mut confirm_new = rpassword::prompt_password("Confirm new password: ")?;
    let result = validate::password_change(&current, &new, &confirm_new)
        .and_then(|_| ctx.api.change_password(&current, &new));
    current.zeroize();
    new.zeroize();
    confirm_new.zeroize();
    result?;
    println!("Password changed successfully");
    Ok(())
}

pub fn deactivate(ctx: &Context, yes: bool) -> Result<()> {
    ctx.require_login()?;
    if !yes
        && !confirm("Deactivate your account? This cannot be undone and signs you out.")?
    {
        println!("Cancelled.");
        return Ok(());
    }
    ctx.api.deactivate()?;
    println!("Account deactivated.");
    Ok(())
}
