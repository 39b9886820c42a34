use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::api::ApiClient;
use crate::error::{PennyError, Result};
use crate::form::{Form, FormEvent, FormField};
use crate::models::{BankingUpdate, ProfileUpdate, User};
use crate::settings::{save_settings, Settings};
use crate::tui::{draw_chrome, draw_hints, Toast};
use crate::validate::{self, FieldError};

const CURRENCIES: [&str; 5] = ["IDR", "USD", "EUR", "SGD", "AUD"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Profile,
    Banking,
    Password,
    Preferences,
}

impl Tab {
    const ALL: [Tab; 4] = [Tab::Profile, Tab::Banking, Tab::Password, Tab::Preferences];

    fn label(self) -> &'static str {
        match self {
            Tab::Profile => "Profile",
            Tab::Banking => "Banking",
            Tab::Password => "Password",
            Tab::Preferences => "Preferences",
        }
    }
}

pub enum SettingsAction {
    Continue,
    Close,
}

fn profile_form(user: &User) -> Form {
    Form::new(vec![
        FormField::text("name", "Full Name", &user.name),
        FormField::text("email", "Email", &user.email),
        FormField::text("address", "Address", &user.address),
        FormField::text("phone", "Phone", &user.phone),
    ])
}

fn banking_form(user: &User) -> Form {
    Form::new(vec![
        FormField::text("bank_name", "Bank Name", &user.bank_name),
        FormField::text("bank_account_name", "Account Name", &user.bank_account_name),
        FormField::text("bank_account_number", "Account Number", &user.bank_account_number),
    ])
}

fn password_form() -> Form {
    Form::new(vec![
        FormField::secret("current_password", "Current Password"),
        FormField::secret("new_password", "New Password"),
        FormField::secret("confirm_password", "Confirm Password"),
    ])
}

fn preferences_form(settings: &Settings) -> Form {
    let mut currencies: Vec<String> = CURRENCIES.iter().map(|c| c.to_string()).collect();
    let selected = match currencies.iter().position(|c| *c == settings.currency) {
        Some(i) => i,
        None => {
            currencies.push(settings.currency.clone());
            currencies.len() - 1
        }
    };
    Form::new(vec![
        FormField::selector("currency", "Currency", currencies, selected),
        FormField::text("default_tax_rate", "Default Tax %", &settings.default_tax_rate.to_string()),
        FormField::text("due_in_days", "Due In (days)", &settings.due_in_days.to_string()),
        FormField::text("download_dir", "Download Folder", &settings.download_dir),
    ])
}

/// Read the preferences tab back into settings, keeping the API URL.
pub fn apply_preferences(form: &Form, current: &Settings) -> Result<Settings> {
    let mut errors = Vec::new();
    let tax = form.value("default_tax_rate").trim();
    let default_tax_rate = match tax.parse::<f64>() {
        Ok(v) if (0.0..=100.0).contains(&v) => v,
        _ => {
            errors.push(FieldError::new("default_tax_rate", "Tax rate must be between 0 and 100"));
            0.0
        }
    };
    let due_in_days = match form.value("due_in_days").trim().parse::<i64>() {
        Ok(v) if v >= 0 => v,
        _ => {
            errors.push(FieldError::new("due_in_days", "Due days must be a whole number"));
            0
        }
    };
    let download_dir = form.value("download_dir").trim().to_string();
    if download_dir.is_empty() {
        errors.push(FieldError::new("download_dir", "Download folder is required"));
    }
    if !errors.is_empty() {
        return Err(PennyError::Validation(errors));
    }
    Ok(Settings {
        api_url: current.api_url.clone(),
        currency: form.value("currency").to_string(),
        download_dir,
        default_tax_rate,
        due_in_days,
    })
}

pub struct SettingsManager {
    tab: Tab,
    user: User,
    settings: Settings,
    profile: Form,
    banking: Form,
    password: Form,
    preferences: Form,
    toast: Toast,
    greeting: String,
}

impl SettingsManager {
    pub fn new(user: User, settings: Settings, greeting: &str) -> Self {
        Self {
            tab: Tab::Profile,
            profile: profile_form(&user),
            banking: banking_form(&user),
            password: password_form(),
            preferences: preferences_form(&settings),
            user,
            settings,
            toast: Toast::default(),
            greeting: greeting.to_string(),
        }
    }

    /// Latest profile, reflecting any saves made on this screen.
    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn form_mut(&mut self) -> &mut Form {
        match self.tab {
            Tab::Profile => &mut self.profile,
            Tab::Banking => &mut self.banking,
            Tab::Password => &mut self.password,
            Tab::Preferences => &mut self.preferences,
        }
    }

    fn form(&self) -> &Form {
        match self.tab {
            Tab::Profile => &self.profile,
            Tab::Banking => &self.banking,
            Tab::Password => &self.password,
            Tab::Preferences => &self.preferences,
        }
    }

    pub fn draw(&self, frame: &mut Frame) {
        let chrome = draw_chrome(frame, &self.greeting);

        let mut tabs = vec![Span::raw(" ")];
        for (i, tab) in Tab::ALL.iter().enumerate() {
            let style = if *tab == self.tab {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            tabs.push(Span::styled(format!("F{} {}", i + 1, tab.label()), style));
            tabs.push(Span::raw("   "));
        }

        let mut lines = vec![
            Line::from(""),
            Line::from(Span::styled(" Settings", Style::default().add_modifier(Modifier::BOLD))),
            Line::from(""),
            Line::from(tabs),
            Line::from(""),
        ];
        lines.extend(self.form().lines());
        if self.tab == Tab::Preferences {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!("   API: {}", self.settings.api_url),
                Style::default().fg(Color::DarkGray),
            )));
        }
        frame.render_widget(Paragraph::new(lines), chrome.content);
        draw_hints(
            frame,
            chrome.hints,
            &self.toast,
            "F1-F4=tab  Tab=next field  Enter=save  Esc=back",
        );
    }

    pub fn handle_key(&mut self, key: KeyEvent, api: &ApiClient) -> SettingsAction {
        self.toast.tick();
        if let KeyCode::F(n @ 1..=4) = key.code {
            self.tab = Tab::ALL[usize::from(n - 1)];
            return SettingsAction::Continue;
        }
        match self.form_mut().handle_key(key.code) {
            FormEvent::Cancel => return SettingsAction::Close,
            FormEvent::Submit => self.submit(api),
            FormEvent::Changed | FormEvent::None => {}
        }
        SettingsAction::Continue
    }

    fn submit(&mut self, api: &ApiClient) {
        let result = match self.tab {
            Tab::Profile => self.save_profile(api),
            Tab::Banking => self.save_banking(api),
            Tab::Password => self.save_password(api),
            Tab::Preferences => self.save_preferences(),
        };
        match result {
            Ok(msg) => self.toast.set(msg),
            Err(PennyError::Validation(errors)) => self.form_mut().set_errors(errors),
            Err(e) => {
                tracing::warn!(tab = self.tab.label(), error = %e, "settings save failed");
                self.toast.set(e.to_string());
            }
        }
    }

    fn save_profile(&mut self, api: &ApiClient) -> Result<&'static str> {
        let f = &self.profile;
        let update = ProfileUpdate {
            name: f.value("name").trim().to_string(),
            email: f.value("email").trim().to_string(),
            address: f.value("address").trim().to_string(),
            phone: f.value("phone").trim().to_string(),
        };
        validate::profile(&update.name, &update.email, &update.address, &update.phone)?;
        api.update_profile(&update)?;
        self.user.name = update.name;
        self.user.email = update.email;
        self.user.address = update.address;
        self.user.phone = update.phone;
        Ok("Profile updated successfully")
    }

    fn save_banking(&mut self, api: &ApiClient) -> Result<&'static str> {
        let f = &self.banking;
        let update = BankingUpdate {
            bank_name: f.value("bank_name").trim().to_string(),
            bank_account_name: f.value("bank_account_name").trim().to_string(),
            bank_account_number: f.value("bank_account_number").trim().to_string(),
        };
        validate::banking(
            &update.bank_name,
            &update.bank_account_name,
            &update.bank_account_number,
        )?;
        api.update_banking(&update)?;
        self.user.bank_name = update.bank_name;
        self.user.bank_account_name = update.bank_account_name;
        self.user.bank_account_number = update.bank_account_number;
        Ok("Banking information updated successfully")
    }

    fn save_password(&mut self, api: &ApiClient) -> Result<&'static str> {
        let f = &self.password;
        validate::password_change(
            f.value("current_password"),
            f.value("new_password"),
            f.value("confirm_password"),
        )?;
        api.change_password(f.value("current_password"), f.value("new_password"))?;
        // Fresh form: the old one zeroizes its secrets on drop.
        self.password = password_form();
        Ok("Password changed successfully")
    }

    fn save_preferences(&mut self) -> Result<&'static str> {
        let updated = apply_preferences(&self.preferences, &self.settings)?;
        save_settings(&updated)?;
        self.settings = updated;
        Ok("Preferences saved")
    }
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
    fn preferences_keep_api_url_and_parse_numbers() {
        let current = Settings {
            api_url: "https://api.example.test".into(),
            currency: "USD".into(),
            ..Settings::default()
        };
        let form = preferences_form(&current);
        let updated = apply_preferences(&form, &current).unwrap();
        assert_eq!(updated.api_url, "https://api.example.test");
        assert_eq!(updated.currency, "USD");
        assert_eq!(updated.due_in_days, current.due_in_days);
    }

    #[test]
    fn unknown_currency_stays_selectable() {
        let current = Settings {
            currency: "JPY".into(),
            ..Settings::default()
        };
        let form = preferences_form(&current);
        assert_eq!(form.value("currency"), "JPY");
    }

    #[test]
    fn bad_tax_rate_is_a_field_error() {
        let current = Settings::default();
        let mut form = preferences_form(&current);
        form.handle_key(KeyCode::Tab);
        type_into(&mut form, "x");
        match apply_preferences(&form, &current) {
            Err(PennyError::Validation(errors)) => assert_eq!(errors[0].field, "default_tax_rate"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn tabs_switch_on_function_keys() {
        let mut m = SettingsManager::new(User::default(), Settings::default(), "hi");
        let api = ApiClient::new("http://127.0.0.1:9").unwrap();
        m.handle_key(KeyEvent::from(KeyCode::F(3)), &api);
        assert_eq!(m.tab, Tab::Password);
        m.handle_key(KeyEvent::from(KeyCode::F(4)), &api);
        assert_eq!(m.tab, Tab::Preferences);
    }
}
