use zeroize::Zeroize;

use crate::cli::{prompt, Context};
use crate::error::{PennyError, Result};
use crate::models::SignUpRequest;
use crate::validate;

fn read_secret(label: &str) -> Result<String> {
    Ok(rpassword::prompt_password(label)?)
}

pub fn login(ctx: &Context, email: Option<String>) -> Result<()> {
    let email = match email {
        Some(e) => e,
        None => prompt("Email: ")?,
    };
    let mut password = read_secret("Password: ")?;
    let mut check = validate::Checker::new();
    check
        .required("email", &email, "Email is required")
        .email("email", &email, "Invalid email address")
        .required("password", &password, "Password is required");
    let result = check.finish().and_then(|_| ctx.api.login(email.trim(), &password));
    password.zeroize();
    let user = result?;
    println!("Logged in as {} <{}>", user.name, user.email);
    Ok(())
}

pub fn logout(ctx: &Context) -> Result<()> {
    ctx.api.logout()?;
    println!("Logged out.");
    Ok(())
}

pub fn register(ctx: &Context) -> Result<()> {
    println!("Create your account");
    let name = prompt("Full name: ")?;
    let address = prompt("Address: ")?;
    let email = prompt("Email: ")?;
    let phone = prompt("Phone (digits only): ")?;
    let mut password = read_secret("Password: ")?;
    let mut confirm = read_secret("Confirm password: ")?;

    let identity = validate::sign_up_identity(&name, &address, &email, &password, &confirm, &phone);
    confirm.zeroize();
    if let Err(e) = identity {
        password.zeroize();
        return Err(e);
    }

    println!();
    println!("Banking details (shown on your invoices)");
    let bank_name = prompt("Bank name: ")?;
    let bank_account_number = prompt("Account number: ")?;
    let bank_account_name = prompt("Account holder name: ")?;
    if let Err(e) = validate::sign_up_banking(&bank_name, &bank_account_number, &bank_account_name) {
        password.zeroize();
        return Err(e);
    }

    let mut req = SignUpRequest {
        name: name.trim().to_string(),
        email: email.trim().to_string(),
        password: std::mem::take(&mut password),
        address: address.trim().to_string(),
        phone: phone.trim().to_string(),
        bank_name: bank_name.trim().to_string(),
        bank_account_name: bank_account_name.trim().to_string(),
        bank_account_number: bank_account_number.trim().to_string(),
    };
    let result = ctx.api.register(&req);
    req.password.zeroize();
    let user = result?;
    println!("Welcome, {}! You are now logged in.", user.name);
    Ok(())
}

pub fn whoami(ctx: &Context) -> Result<()> {
    ctx.require_login()?;
    match ctx.api.restore()? {
        Some(user) => {
            println!("Name:     {}", user.name);
            println!("Email:    {}", user.email);
            if !user.phone.is_empty() {
                println!("Phone:    {}", user.phone);
            }
            if !user.address.is_empty() {
                println!("Address:  {}", user.address);
            }
            Ok(())
        }
        None => Err(PennyError::Unauthorized),
    }
}
