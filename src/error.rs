use thiserror::Error;

use crate::validate::FieldError;

#[derive(Error, Debug)]
pub enum PennyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Session expired or invalid. Run `penny login` again.")]
    Unauthorized,

    #[error("Not logged in. Run `penny login` first.")]
    NotLoggedIn,

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("{}", format_field_errors(.0))]
    Validation(Vec<FieldError>),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, PennyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_joins_messages() {
        let err = PennyError::Validation(vec![
            FieldError::new("name", "Name is required"),
            FieldError::new("email", "Email is required"),
        ]);
        assert_eq!(err.to_string(), "Name is required; Email is required");
    }

    #[test]
    fn api_error_includes_status() {
        let err = PennyError::Api {
            status: 404,
            message: "invoice not found".into(),
        };
        assert_eq!(err.to_string(), "API error (404): invoice not found");
    }
}
