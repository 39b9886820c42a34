pub mod account;
pub mod auth;
pub mod client_manager;
pub mod clients;
pub mod dashboard;
pub mod generate;
pub mod invoice_editor;
pub mod invoice_manager;
pub mod invoices;
pub mod login;
pub mod settings_manager;
pub mod status;

use std::io::Write;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use crate::api::ApiClient;
use crate::error::{PennyError, Result};
use crate::settings::{load_settings, resolve_api_url, Settings, API_URL_ENV};
use crate::session;

#[derive(Parser)]
#[command(
    name = "penny",
    version,
    about = "Create, send and track invoices from the terminal."
)]
pub struct Cli {
    /// API base URL (overrides PENNY_API_URL and settings.json)
    #[arg(long = "api-url", global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store the session.
    Login {
        /// Account email (prompted when omitted)
        #[arg(long)]
        email: Option<String>,
    },
    /// Forget the stored session.
    Logout,
    /// Create an account, then sign in.
    Register,
    /// Show the signed-in user.
    Whoami,
    /// Show configuration and session state.
    Status,
    /// Manage clients.
    Clients {
        #[command(subcommand)]
        command: ClientsCommands,
    },
    /// Manage invoices.
    Invoices {
        #[command(subcommand)]
        command: InvoicesCommands,
    },
    /// Update profile, banking details or password.
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },
    /// Render a PDF from a JSON invoice without signing in.
    Generate {
        /// Path to the invoice JSON document
        file: String,
        /// Output file path (default: <download_dir>/invoice-<client>-<date>.pdf)
        #[arg(long)]
        output: Option<String>,
    },
    /// Print shell completions.
    Completions {
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ClientsCommands {
    /// List clients.
    List {
        /// Filter by name, email or phone
        #[arg(long)]
        search: Option<String>,
    },
    /// Add a client.
    Add {
        name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    /// Update a client. Omitted fields keep their current value.
    Update {
        /// Client ID (shown in `penny clients list`)
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    /// Delete a client.
    Delete {
        id: i64,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
}

/// Invoice fields shared by create and update.
#[derive(clap::Args, Default)]
pub struct InvoiceArgs {
    /// Bill an existing client by ID
    #[arg(long = "client-id")]
    pub client_id: Option<i64>,
    #[arg(long = "client-name")]
    pub client_name: Option<String>,
    #[arg(long = "client-email")]
    pub client_email: Option<String>,
    #[arg(long = "client-address")]
    pub client_address: Option<String>,
    #[arg(long = "client-phone")]
    pub client_phone: Option<String>,
    /// Invoice number
    #[arg(long)]
    pub number: Option<String>,
    /// Issue date: YYYY-MM-DD
    #[arg(long = "issue-date")]
    pub issue_date: Option<String>,
    /// Due date: YYYY-MM-DD
    #[arg(long = "due-date")]
    pub due_date: Option<String>,
    /// Tax rate in percent
    #[arg(long = "tax-rate")]
    pub tax_rate: Option<f64>,
    #[arg(long)]
    pub notes: Option<String>,
    /// Line item as DESCRIPTION:QTY:UNIT_PRICE (repeatable; replaces items on update)
    #[arg(long = "item")]
    pub items: Vec<String>,
}

#[derive(Subcommand)]
pub enum InvoicesCommands {
    /// List invoices.
    List {
        /// Filter by invoice number or client name
        #[arg(long)]
        search: Option<String>,
        /// Status filter: all, draft, sent, paid, overdue
        #[arg(long, default_value = "all")]
        status: String,
    },
    /// Print an invoice preview.
    Show { id: i64 },
    /// Create a draft invoice.
    Create {
        #[command(flatten)]
        args: InvoiceArgs,
    },
    /// Update an invoice.
    Update {
        id: i64,
        #[command(flatten)]
        args: InvoiceArgs,
    },
    /// Delete an invoice.
    Delete {
        id: i64,
        #[arg(long, short)]
        yes: bool,
    },
    /// Download the invoice PDF.
    Download {
        id: i64,
        /// Output file path (default: <download_dir>/invoice-<number>.pdf)
        #[arg(long)]
        output: Option<String>,
    },
    /// Email the invoice to the client.
    Send { id: i64 },
    /// Set the invoice status.
    Mark {
        id: i64,
        /// draft, sent, paid or overdue
        status: String,
    },
    /// Revenue and payment totals.
    Summary,
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Update profile details. Omitted fields keep their current value.
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Update banking details. Omitted fields keep their current value.
    Banking {
        #[arg(long = "bank-name")]
        bank_name: Option<String>,
        #[arg(long = "account-name")]
        account_name: Option<String>,
        #[arg(long = "account-number")]
        account_number: Option<String>,
    },
    /// Change the account password.
    Password,
    /// Permanently deactivate the account.
    Deactivate {
        #[arg(long, short)]
        yes: bool,
    },
}

/// Settings plus an API client carrying the stored session.
pub struct Context {
    pub settings: Settings,
    pub api: ApiClient,
}

impl Context {
    pub fn load(api_url: Option<&str>) -> Result<Self> {
        let settings = load_settings();
        let url = resolve_api_url(api_url, std::env::var(API_URL_ENV).ok(), &settings);
        tracing::debug!(%url, "using api");
        let api = ApiClient::new(&url)?
            .with_session(session::load())
            .persist_to(session::session_path());
        Ok(Self { settings, api })
    }

    pub fn require_login(&self) -> Result<()> {
        if self.api.is_authenticated() {
            Ok(())
        } else {
            Err(PennyError::NotLoggedIn)
        }
    }
}

pub(crate) fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    std::io::stdout().flush()?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// `[y/N]` question; anything but y/yes declines.
pub(crate) fn confirm(question: &str) -> Result<bool> {
    let answer = prompt(&format!("{question} [y/N] "))?;
    Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
}
