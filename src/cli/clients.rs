use comfy_table::{Cell, Table};

use crate::cli::{confirm, Context};
use crate::error::Result;
use crate::listing::filter_clients;
use crate::models::{Client, ClientInput};
use crate::validate;

pub fn list(ctx: &Context, search: Option<&str>) -> Result<()> {
    ctx.require_login()?;
    let clients = ctx.api.list_clients()?;
    let shown = filter_clients(&clients, search.unwrap_or(""));
    if shown.is_empty() {
        println!("No clients found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Email", "Phone", "Address"]);
    for c in shown {
        table.add_row(vec![
            Cell::new(c.id),
            Cell::new(&c.name),
            Cell::new(c.email.as_deref().unwrap_or("")),
            Cell::new(c.phone.as_deref().unwrap_or("")),
            Cell::new(c.address.as_deref().unwrap_or("")),
        ]);
    }
    println!("Clients\n{table}");
    Ok(())
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn build_input(
    name: String,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
) -> Result<ClientInput> {
    let input = ClientInput {
        name: name.trim().to_string(),
        email: blank_to_none(email),
        phone: blank_to_none(phone),
        address: blank_to_none(address),
    };
    validate::client(&input.name, input.email.as_deref().unwrap_or(""))?;
    Ok(input)
}

/// Overlay the given fields on an existing client. An empty string clears an
/// optional field.
pub fn merge_update(
    current: &Client,
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
) -> Result<ClientInput> {
    build_input(
        name.unwrap_or_else(|| current.name.clone()),
        email.or_else(|| current.email.clone()),
        phone.or_else(|| current.phone.clone()),
        address.or_else(|| current.address.clone()),
    )
}

pub fn add(
    ctx: &Context,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
) -> Result<()> {
    let input = build_input(name, email, phone, address)?;
    ctx.require_login()?;
    ctx.api.create_client(&input)?;
    println!("Added client: {}", input.name);
    Ok(())
}

pub fn update(
    ctx: &Context,
    id: i64,
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
) -> Result<()> {
    ctx.require_login()?;
    let current = ctx.api.get_client(id)?;
    let input = merge_update(&current, name, email, phone, address)?;
    ctx.api.update_client(id, &input)?;
    println!("Updated client {id}: {}", input.name);
    Ok(())
}

pub fn delete(ctx: &Context, id: i64, yes: bool) -> Result<()> {
    ctx.require_login()?;
    let client = ctx.api.get_client(id)?;
    if !yes && !confirm(&format!("Delete client '{}'?", client.name))? {
        println!("Cancelled.");
        return Ok(());
    }
    ctx.api.delete_client(id)?;
    println!("Deleted client {id}: {}", client.name);
    Ok(())
}
