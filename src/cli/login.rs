use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::api::ApiClient;
use crate::error::{PennyError, Result};
use crate::form::{Form, FormEvent, FormField};
use crate::models::{SignUpRequest, User};
use crate::tui::{draw_chrome, draw_hints, run_view, Toast, View, ViewAction};
use crate::validate;

enum Screen {
    SignIn(Form),
    RegisterIdentity,
    RegisterBanking,
}

pub struct LoginScreen {
    screen: Screen,
    identity: Form,
    banking: Form,
    toast: Toast,
    user: Option<User>,
}

fn sign_in_form() -> Form {
    Form::new(vec![
        FormField::text("email", "Email", ""),
        FormField::secret("password", "Password"),
    ])
}

fn identity_form() -> Form {
    Form::new(vec![
        FormField::text("name", "Full Name", ""),
        FormField::text("address", "Address", ""),
        FormField::text("email", "Email", ""),
        FormField::text("phone", "Phone", ""),
        FormField::secret("password", "Password"),
        FormField::secret("confirm_password", "Confirm Password"),
    ])
}

fn banking_form() -> Form {
    Form::new(vec![
        FormField::text("bank_name", "Bank Name", ""),
        FormField::text("bank_account_number", "Account Number", ""),
        FormField::text("bank_account_name", "Account Name", ""),
    ])
}

/// Route validation failures onto the form and anything else to the toast.
fn report(form: &mut Form, toast: &mut Toast, err: PennyError) {
    match err {
        PennyError::Validation(errors) => form.set_errors(errors),
        other => toast.set(other.to_string()),
    }
}

impl LoginScreen {
    pub fn new(message: Option<String>) -> Self {
        let mut toast = Toast::default();
        if let Some(msg) = message {
            toast.set(msg);
        }
        Self {
            screen: Screen::SignIn(sign_in_form()),
            identity: identity_form(),
            banking: banking_form(),
            toast,
            user: None,
        }
    }

    fn active_form(&mut self) -> &mut Form {
        match &mut self.screen {
            Screen::SignIn(f) => f,
            Screen::RegisterIdentity => &mut self.identity,
            Screen::RegisterBanking => &mut self.banking,
        }
    }

    fn submit_sign_in(&mut self, api: &ApiClient) -> ViewAction {
        let Screen::SignIn(form) = &mut self.screen else {
            return ViewAction::Continue;
        };
        let email = form.value("email").trim().to_string();
        let mut check = validate::Checker::new();
        check
            .required("email", &email, "Email is required")
            .email("email", &email, "Invalid email address")
            .required("password", form.value("password"), "Password is required");
        let result = check
            .finish()
            .and_then(|_| api.login(&email, form.value("password")));
        match result {
            Ok(user) => {
                tracing::info!(email = %user.email, "signed in from login screen");
                form.wipe_secrets();
                self.user = Some(user);
                ViewAction::Close
            }
            Err(e) => {
                report(form, &mut self.toast, e);
                ViewAction::Continue
            }
        }
    }

    fn submit_identity(&mut self) {
        let f = &self.identity;
        let result = validate::sign_up_identity(
            f.value("name"),
            f.value("address"),
            f.value("email"),
            f.value("password"),
            f.value("confirm_password"),
            f.value("phone"),
        );
        match result {
            Ok(()) => self.screen = Screen::RegisterBanking,
            Err(e) => report(&mut self.identity, &mut self.toast, e),
        }
    }

    fn submit_banking(&mut self, api: &ApiClient) -> ViewAction {
        let b = &self.banking;
        if let Err(e) = validate::sign_up_banking(
            b.value("bank_name"),
            b.value("bank_account_number"),
            b.value("bank_account_name"),
        ) {
            report(&mut self.banking, &mut self.toast, e);
            return ViewAction::Continue;
        }
        let req = sign_up_request(&self.identity, &self.banking);
        match api.register(&req) {
            Ok(user) => {
                self.identity.wipe_secrets();
                self.user = Some(user);
                ViewAction::Close
            }
            Err(e) => {
                self.toast.set(e.to_string());
                ViewAction::Continue
            }
        }
    }
}

pub fn sign_up_request(identity: &Form, banking: &Form) -> SignUpRequest {
    let t = |form: &Form, key: &str| form.value(key).trim().to_string();
    SignUpRequest {
        name: t(identity, "name"),
        email: t(identity, "email"),
        password: identity.value("password").to_string(),
        address: t(identity, "address"),
        phone: t(identity, "phone"),
        bank_name: t(banking, "bank_name"),
        bank_account_name: t(banking, "bank_account_name"),
        bank_account_number: t(banking, "bank_account_number"),
    }
}

impl View for LoginScreen {
    fn draw(&mut self, frame: &mut Frame) {
        let (title, subtitle, hints) = match self.screen {
            Screen::SignIn(_) => (
                "Sign in",
                "Welcome back. Sign in to manage your invoices.",
                "Tab=next field  Enter=sign in  F2=create account  Esc=quit",
            ),
            Screen::RegisterIdentity => (
                "Create account (1/2)",
                "Your details appear on every invoice you send.",
                "Tab=next field  Enter=continue  F2=back to sign in  Esc=quit",
            ),
            Screen::RegisterBanking => (
                "Create account (2/2)",
                "Banking details for payment instructions.",
                "Tab=next field  Enter=create account  Esc=back",
            ),
        };
        let chrome = draw_chrome(frame, "Invoicing from the terminal.");

        let mut lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                format!(" {title}"),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(format!(" {subtitle}")),
            Line::from(""),
        ];
        lines.extend(self.active_form().lines());
        frame.render_widget(Paragraph::new(lines), chrome.content);
        draw_hints(frame, chrome.hints, &self.toast, hints);
    }

    fn handle_key(&mut self, key: KeyEvent, api: &ApiClient) -> ViewAction {
        self.toast.tick();

        if key.code == KeyCode::F(2) {
            self.screen = match self.screen {
                Screen::SignIn(_) => Screen::RegisterIdentity,
                _ => Screen::SignIn(sign_in_form()),
            };
            return ViewAction::Continue;
        }

        match self.active_form().handle_key(key.code) {
            FormEvent::Submit => match self.screen {
                Screen::SignIn(_) => return self.submit_sign_in(api),
                Screen::RegisterIdentity => self.submit_identity(),
                Screen::RegisterBanking => return self.submit_banking(api),
            },
            FormEvent::Cancel => match self.screen {
                Screen::RegisterBanking => self.screen = Screen::RegisterIdentity,
                _ => return ViewAction::Close,
            },
            FormEvent::Changed | FormEvent::None => {}
        }
        ViewAction::Continue
    }
}

/// Show the sign-in screen until the user signs in or quits.
pub fn run(api: &ApiClient, message: Option<String>) -> Result<Option<User>> {
    let mut screen = LoginScreen::new(message);
    run_view(&mut screen, api)?;
    Ok(screen.user.take())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_into(form: &mut Form, text: &str) {
        for c in text.chars() {
            form.handle_key(KeyCode::Char(c));
        }
    }

    #[test]
    fn sign_up_request_trims_and_merges_steps() {
        let mut identity = identity_form();
        type_into(&mut identity, " Ana Putri ");
        identity.handle_key(KeyCode::Tab);
        type_into(&mut identity, "Jl. Kemang 5");
        identity.handle_key(KeyCode::Tab);
        type_into(&mut identity, "ana@studio.id");
        identity.handle_key(KeyCode::Tab);
        type_into(&mut identity, "08123456789");
        identity.handle_key(KeyCode::Tab);
        type_into(&mut identity, "secret1 ");

        let mut banking = banking_form();
        type_into(&mut banking, "BCA");

        let req = sign_up_request(&identity, &banking);
        assert_eq!(req.name, "Ana Putri");
        assert_eq!(req.phone, "08123456789");
        assert_eq!(req.password, "secret1 ");
        assert_eq!(req.bank_name, "BCA");
    }

    #[test]
    fn validation_errors_land_on_the_form() {
        let mut form = sign_in_form();
        let mut toast = Toast::default();
        report(
            &mut form,
            &mut toast,
            PennyError::Validation(vec![validate::FieldError::new("password", "Password is required")]),
        );
        assert_eq!(form.error_for("password"), Some("Password is required"));
        assert_eq!(toast.message(), None);

        report(&mut form, &mut toast, PennyError::Unauthorized);
        assert!(toast.message().is_some());
    }
}
