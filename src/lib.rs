pub mod api;
pub mod cli;
pub mod error;
pub mod fmt;
pub mod form;
pub mod invoice_form;
pub mod listing;
pub mod logging;
pub mod models;
pub mod pagination;
pub mod preview;
pub mod public_invoice;
pub mod session;
pub mod settings;
pub mod totals;
pub mod tui;
pub mod validate;
