use std::sync::OnceLock;

use regex::Regex;

use crate::error::{PennyError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
    })
}

fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{10,15}$").expect("phone pattern compiles"))
}

fn bank_account_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{8,20}$").expect("account pattern compiles"))
}

pub fn is_email(value: &str) -> bool {
    email_re().is_match(value.trim())
}

/// Collects field errors for one form. Each check records at most one
/// error per field: the first failing rule wins.
#[derive(Debug, Default)]
pub struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    pub fn new() -> Self {
        Self::default()
    }

    fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    fn push(&mut self, field: &'static str, message: impl Into<String>) -> &mut Self {
        if !self.has(field) {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    pub fn required(&mut self, field: &'static str, value: &str, message: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.push(field, message);
        }
        self
    }

    pub fn min_len(&mut self, field: &'static str, value: &str, min: usize, message: &str) -> &mut Self {
        if value.trim().chars().count() < min {
            self.push(field, message);
        }
        self
    }

    /// Email shape check; blank values pass so optional emails can use it.
    pub fn email(&mut self, field: &'static str, value: &str, message: &str) -> &mut Self {
        if !value.trim().is_empty() && !is_email(value) {
            self.push(field, message);
        }
        self
    }

    pub fn phone_digits(&mut self, field: &'static str, value: &str) -> &mut Self {
        if !value.trim().is_empty() && !phone_re().is_match(value.trim()) {
            self.push(field, "Phone number must be 10-15 digits");
        }
        self
    }

    pub fn account_digits(&mut self, field: &'static str, value: &str) -> &mut Self {
        if !value.trim().is_empty() && !bank_account_re().is_match(value.trim()) {
            self.push(field, "Bank account number must be 8-20 digits");
        }
        self
    }

    pub fn matches(&mut self, field: &'static str, a: &str, b: &str, message: &str) -> &mut Self {
        if a != b {
            self.push(field, message);
        }
        self
    }

    pub fn check(&mut self, field: &'static str, ok: bool, message: &str) -> &mut Self {
        if !ok {
            self.push(field, message);
        }
        self
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn finish(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(PennyError::Validation(self.errors))
        }
    }
}

// ---------------------------------------------------------------------------
// Form rules
// ---------------------------------------------------------------------------

pub fn client(name: &str, email: &str) -> Result<()> {
    let mut c = Checker::new();
    c.required("name", name, "Name is required")
        .email("email", email, "Invalid email address");
    c.finish()
}

/// First registration step: identity and credentials.
pub fn sign_up_identity(
    name: &str,
    address: &str,
    email: &str,
    password: &str,
    confirm: &str,
    phone: &str,
) -> Result<()> {
    let mut c = Checker::new();
    c.required("name", name, "Name is required")
        .min_len("name", name, 2, "Name must be at least 2 characters")
        .required("address", address, "Address is required")
        .min_len("address", address, 5, "Address must be at least 5 characters")
        .required("email", email, "Email is required")
        .email("email", email, "Invalid email address")
        .required("password", password, "Password is required")
        .min_len("password", password, 6, "Password must be at least 6 characters")
        .required("confirm_password", confirm, "Confirm Password is required")
        .matches("confirm_password", password, confirm, "Passwords must match")
        .required("phone", phone, "Phone number is required")
        .phone_digits("phone", phone);
    c.finish()
}

/// Second registration step: banking details.
pub fn sign_up_banking(bank_name: &str, account_number: &str, account_name: &str) -> Result<()> {
    let mut c = Checker::new();
    c.required("bank_name", bank_name, "Bank name is required")
        .min_len("bank_name", bank_name, 2, "Bank name must be at least 2 characters")
        .required("bank_account_number", account_number, "Bank account number is required")
        .account_digits("bank_account_number", account_number)
        .required("bank_account_name", account_name, "Account name is required")
        .min_len("bank_account_name", account_name, 2, "Account name must be at least 2 characters");
    c.finish()
}

pub fn profile(name: &str, email: &str, address: &str, phone: &str) -> Result<()> {
    let mut c = Checker::new();
    c.min_len("name", name, 2, "Name must be at least 2 characters")
        .required("email", email, "Invalid email address")
        .email("email", email, "Invalid email address")
        .required("address", address, "Address is required")
        .required("phone", phone, "Phone number is required");
    c.finish()
}

pub fn banking(bank_name: &str, account_name: &str, account_number: &str) -> Result<()> {
    let mut c = Checker::new();
    c.required("bank_name", bank_name, "Bank name is required")
        .required("bank_account_name", account_name, "Account name is required")
        .required("bank_account_number", account_number, "Account number is required");
    c.finish()
}

pub fn password_change(current: &str, new: &str, confirm: &str) -> Result<()> {
    let mut c = Checker::new();
    c.required("current_password", current, "Current password is required")
        .min_len("new_password", new, 6, "New password must be at least 6 characters")
        .required("confirm_password", confirm, "Please confirm your new password")
        .matches("confirm_password", new, confirm, "Passwords don't match");
    c.finish()
}

pub fn field_errors(result: &Result<()>) -> &[FieldError] {
    match result {
        Err(PennyError::Validation(errors)) => errors,
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_email("ana@studio.id"));
        assert!(!is_email("ana@studio"));
        assert!(!is_email("ana studio@x.id"));
        assert!(!is_email(""));
    }

    #[test]
    fn client_requires_only_name() {
        assert!(client("Acme", "").is_ok());
        let r = client("", "bad");
        let fields: Vec<_> = field_errors(&r).iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["name", "email"]);
    }

    #[test]
    fn first_failing_rule_wins_per_field() {
        let r = sign_up_identity("", "Jl. Sudirman 1", "a@b.co", "secret1", "secret1", "081234567890");
        let errs = field_errors(&r);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].message, "Name is required");
    }

    #[test]
    fn sign_up_identity_checks_everything() {
        let r = sign_up_identity("A", "Jl", "nope", "123", "456", "12ab");
        let messages: Vec<_> = field_errors(&r).iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Name must be at least 2 characters",
                "Address must be at least 5 characters",
                "Invalid email address",
                "Password must be at least 6 characters",
                "Passwords must match",
                "Phone number must be 10-15 digits",
            ]
        );
    }

    #[test]
    fn sign_up_banking_digit_rule() {
        assert!(sign_up_banking("BCA", "1234567890", "Ana Putri").is_ok());
        let r = sign_up_banking("BCA", "12-34", "Ana Putri");
        assert_eq!(field_errors(&r)[0].message, "Bank account number must be 8-20 digits");
    }

    #[test]
    fn password_change_requires_match() {
        assert!(password_change("old", "newpass", "newpass").is_ok());
        let r = password_change("old", "newpass", "newpasz");
        assert_eq!(field_errors(&r)[0].message, "Passwords don't match");
    }

    #[test]
    fn profile_and_banking_rules() {
        assert!(profile("Ana", "ana@studio.id", "Jakarta", "0812").is_ok());
        assert!(profile("A", "ana@studio.id", "Jakarta", "0812").is_err());
        assert!(banking("BCA", "Ana", "123").is_ok());
        assert_eq!(field_errors(&banking("", "", "")).len(), 3);
    }
}
