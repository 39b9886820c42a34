use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent};
use rand::seq::SliceRandom;
use ratatui::{
    layout::{Constraint, Layout},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::api::ApiClient;
use crate::cli::client_manager::{ClientAction, ClientManager};
use crate::cli::invoice_editor::{EditorAction, InvoiceEditor};
use crate::cli::invoice_manager::{InvoiceAction, InvoiceManager};
use crate::cli::settings_manager::{SettingsAction, SettingsManager};
use crate::cli::{login, Context};
use crate::error::Result;
use crate::fmt::{display_date, money};
use crate::listing::{dashboard_stats, recent_invoices, DashboardStats};
use crate::models::{Invoice, User};
use crate::settings::Settings;
use crate::tui::{
    clip, draw_chrome, draw_hints, run_view, status_style, Toast, View, ViewAction, AMOUNT_STYLE,
    BORDER_STYLE, SELECTED_STYLE,
};

const GREETINGS: &[&str] = &[
    "Let's get you paid.",
    "Invoices don't send themselves.",
    "Back again? Brilliant.",
    "Another day, another invoice.",
    "Shall we chase a few payments?",
    "Pull up a chair.",
    "Your clients are waiting.",
    "Everything's in order. Well, mostly.",
    "Ah, there you are.",
    "Right then, where were we?",
];

const MENU_ITEMS: &[&str] = &[
    "View invoices",
    "Create a new invoice",
    "Manage clients",
    "Settings",
    "Log out",
];

enum DashboardScreen {
    Home,
    Invoices(InvoiceManager),
    /// The invoice list we came from, if any, is kept so closing the editor
    /// returns to it with search and filters intact.
    Editor {
        editor: Box<InvoiceEditor>,
        list: Option<InvoiceManager>,
    },
    Clients(ClientManager),
    Settings(Box<SettingsManager>),
}

struct HomeData {
    stats: DashboardStats,
    recent: Vec<Invoice>,
}

struct Dashboard {
    screen: DashboardScreen,
    greeting: String,
    menu_selection: usize,
    user: User,
    settings: Settings,
    home_data: Option<HomeData>,
    toast: Toast,
    logged_out: bool,
}

fn pick_greeting(user_name: &str) -> String {
    let mut rng = rand::thread_rng();
    let random_greeting = GREETINGS.choose(&mut rng).unwrap_or(&"Hello.");
    match user_name.split_whitespace().next() {
        Some(first) => format!("Hello, {first}. {random_greeting}"),
        None => random_greeting.to_string(),
    }
}

impl Dashboard {
    fn new(user: User, settings: Settings, api: &ApiClient) -> Self {
        let mut dashboard = Self {
            screen: DashboardScreen::Home,
            greeting: pick_greeting(&user.name),
            menu_selection: 0,
            user,
            settings,
            home_data: None,
            toast: Toast::default(),
            logged_out: false,
        };
        dashboard.load_data(api);
        dashboard
    }

    fn load_data(&mut self, api: &ApiClient) {
        let fetched = api.list_invoices().and_then(|invoices| {
            let clients = api.list_clients()?;
            let summary = api.invoice_summary()?;
            Ok((invoices, clients, summary))
        });
        match fetched {
            Ok((invoices, clients, summary)) => {
                let stats = dashboard_stats(&invoices, &clients, summary);
                let recent = recent_invoices(&invoices).into_iter().cloned().collect();
                self.home_data = Some(HomeData { stats, recent });
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load dashboard data");
                self.toast.set(format!("Could not load dashboard: {e}"));
            }
        }
    }

    fn sender(&self) -> Option<User> {
        Some(self.user.clone())
    }

    fn go_home(&mut self, api: &ApiClient) {
        self.screen = DashboardScreen::Home;
        self.load_data(api);
    }

    fn draw_home(&self, frame: &mut Frame) {
        let chrome = draw_chrome(frame, &self.greeting);
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let sep_line = "━".repeat(chrome.content.width as usize);

        let [stats_area, sep1, recent_area, sep2, menu_area] = Layout::vertical([
            Constraint::Length(4),
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
            Constraint::Length(MENU_ITEMS.len() as u16 + 1),
        ])
        .areas(chrome.content);
        let sep_widget = Paragraph::new(sep_line.as_str()).style(BORDER_STYLE);
        frame.render_widget(sep_widget.clone(), sep1);
        frame.render_widget(sep_widget, sep2);

        if let Some(data) = &self.home_data {
            let cur = &self.settings.currency;
            let s = &data.stats;
            let [left, right] =
                Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(stats_area);
            let left_lines = vec![
                Line::from(""),
                Line::from(format!(" Total Invoices   {}", s.total_invoices)),
                Line::from(vec![
                    Span::raw(" Total Revenue    "),
                    Span::styled(money(cur, s.total_revenue), AMOUNT_STYLE),
                ]),
                Line::from(format!(" Clients          {}", s.total_clients)),
            ];
            let right_lines = vec![
                Line::from(""),
                Line::from(format!(" Paid Invoices    {}", s.paid_invoices)),
                Line::from(vec![
                    Span::raw(" Paid             "),
                    Span::styled(money(cur, s.paid_amount), AMOUNT_STYLE),
                ]),
                Line::from(format!(" Pending          {}", money(cur, s.pending_amount))),
            ];
            frame.render_widget(Paragraph::new(left_lines), left);
            frame.render_widget(Paragraph::new(right_lines), right);

            let mut recent = vec![Line::from(Span::styled(" Recent Invoices", bold))];
            if data.recent.is_empty() {
                recent.push(Line::from(" Nothing yet. Create your first invoice below."));
            }
            for inv in &data.recent {
                recent.push(Line::from(vec![
                    Span::raw(format!(
                        " {:<18} {:<24} {:<12} ",
                        clip(&inv.invoice_number, 18),
                        clip(&inv.client_name, 24),
                        display_date(&inv.due_date)
                    )),
                    Span::styled(format!("{:<9}", inv.status.label()), status_style(inv.status)),
                    Span::raw(format!(" {:>16}", money(cur, inv.total))),
                ]));
            }
            frame.render_widget(Paragraph::new(recent), recent_area);
        }

        let mut menu = vec![Line::from(Span::styled(" What would you like to do?", bold))];
        for (i, item) in MENU_ITEMS.iter().enumerate() {
            let selected = i == self.menu_selection;
            menu.push(Line::from(Span::styled(
                format!("{}{item}", if selected { " > " } else { "   " }),
                if selected { SELECTED_STYLE } else { Style::default() },
            )));
        }
        frame.render_widget(Paragraph::new(menu), menu_area);

        draw_hints(
            frame,
            chrome.hints,
            &self.toast,
            "Up/Down=navigate  Enter=select  r=refresh  q=quit",
        );
    }

    fn handle_home_key(&mut self, code: KeyCode, api: &ApiClient) -> ViewAction {
        self.toast.tick();
        match code {
            KeyCode::Up => self.menu_selection = self.menu_selection.saturating_sub(1),
            KeyCode::Down => self.menu_selection = (self.menu_selection + 1).min(MENU_ITEMS.len() - 1),
            KeyCode::Char('r') => {
                self.load_data(api);
                self.toast.set("Refreshed");
            }
            KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Close,
            KeyCode::Enter => match self.menu_selection {
                0 => {
                    self.screen = DashboardScreen::Invoices(InvoiceManager::new(
                        api,
                        &self.greeting,
                        self.sender(),
                        &self.settings,
                    ))
                }
                1 => {
                    self.screen = DashboardScreen::Editor {
                        editor: Box::new(self.new_editor()),
                        list: None,
                    }
                }
                2 => self.screen = DashboardScreen::Clients(ClientManager::new(api, &self.greeting)),
                3 => {
                    self.screen = DashboardScreen::Settings(Box::new(SettingsManager::new(
                        self.user.clone(),
                        self.settings.clone(),
                        &self.greeting,
                    )))
                }
                4 => {
                    if let Err(e) = api.logout() {
                        tracing::warn!(error = %e, "logout failed");
                        self.toast.set(format!("Could not log out: {e}"));
                    } else {
                        self.logged_out = true;
                        return ViewAction::Close;
                    }
                }
                _ => {}
            },
            _ => {}
        }
        ViewAction::Continue
    }

    fn new_editor(&self) -> InvoiceEditor {
        InvoiceEditor::create(
            self.sender(),
            &self.settings.currency,
            self.settings.due_in_days,
            self.settings.default_tax_rate,
        )
    }

    fn on_invoice_action(&mut self, action: InvoiceAction, api: &ApiClient) {
        let list = match std::mem::replace(&mut self.screen, DashboardScreen::Home) {
            DashboardScreen::Invoices(list) => list,
            other => {
                self.screen = other;
                return;
            }
        };
        match action {
            InvoiceAction::Continue => self.screen = DashboardScreen::Invoices(list),
            InvoiceAction::Close => self.go_home(api),
            InvoiceAction::New => {
                self.screen = DashboardScreen::Editor {
                    editor: Box::new(self.new_editor()),
                    list: Some(list),
                }
            }
            InvoiceAction::Edit(invoice) => {
                // List rows may come without items; edit the full record.
                let mut list = list;
                match api.get_invoice(invoice.id) {
                    Ok(full) => {
                        self.screen = DashboardScreen::Editor {
                            editor: Box::new(InvoiceEditor::edit(&full, self.sender(), &self.settings.currency)),
                            list: Some(list),
                        }
                    }
                    Err(e) => {
                        list.set_toast(format!("Failed to load invoice: {e}"));
                        self.screen = DashboardScreen::Invoices(list);
                    }
                }
            }
        }
    }

    fn on_editor_action(&mut self, action: EditorAction, api: &ApiClient) {
        let message = match action {
            EditorAction::Continue => return,
            EditorAction::Close => None,
            EditorAction::Saved(msg) => Some(msg),
        };
        let list = match std::mem::replace(&mut self.screen, DashboardScreen::Home) {
            DashboardScreen::Editor { list, .. } => list,
            other => {
                self.screen = other;
                return;
            }
        };
        match list {
            Some(mut list) => {
                if let Some(msg) = message {
                    list.reload(api);
                    list.set_toast(msg);
                }
                self.screen = DashboardScreen::Invoices(list);
            }
            None => {
                self.go_home(api);
                if let Some(msg) = message {
                    self.toast.set(msg);
                }
            }
        }
    }
}

impl View for Dashboard {
    fn draw(&mut self, frame: &mut Frame) {
        match &self.screen {
            DashboardScreen::Home => self.draw_home(frame),
            DashboardScreen::Invoices(list) => list.draw(frame),
            DashboardScreen::Editor { editor, .. } => editor.draw(frame),
            DashboardScreen::Clients(clients) => clients.draw(frame),
            DashboardScreen::Settings(settings) => settings.draw(frame),
        }
    }

    fn handle_key(&mut self, key: KeyEvent, api: &ApiClient) -> ViewAction {
        match &mut self.screen {
            DashboardScreen::Home => return self.handle_home_key(key.code, api),
            DashboardScreen::Invoices(list) => {
                let action = list.handle_key(key, api);
                self.on_invoice_action(action, api);
            }
            DashboardScreen::Editor { editor, .. } => {
                let action = editor.handle_key(key, api);
                self.on_editor_action(action, api);
            }
            DashboardScreen::Clients(clients) => {
                if let ClientAction::Close = clients.handle_key(key, api) {
                    self.go_home(api);
                }
            }
            DashboardScreen::Settings(manager) => {
                if let SettingsAction::Close = manager.handle_key(key, api) {
                    self.user = manager.user().clone();
                    self.settings = manager.settings().clone();
                    self.go_home(api);
                }
            }
        }
        ViewAction::Continue
    }

    fn poll_timeout(&self, now: Instant) -> Option<Duration> {
        match &self.screen {
            DashboardScreen::Editor { editor, .. } => editor.poll_timeout(now),
            _ => None,
        }
    }

    fn tick(&mut self, now: Instant) {
        if let DashboardScreen::Editor { editor, .. } = &mut self.screen {
            editor.tick(now);
        }
    }
}

/// Interactive entry point: sign in if needed, then run the dashboard until
/// the user quits. Logging out returns to the sign-in screen.
pub fn run(ctx: &Context) -> Result<()> {
    let mut message = None;
    loop {
        let user = match ctx.api.restore()? {
            Some(user) => user,
            None => match login::run(&ctx.api, message.take())? {
                Some(user) => user,
                None => return Ok(()),
            },
        };
        tracing::info!(email = %user.email, "dashboard opened");

        let mut dashboard = Dashboard::new(user, ctx.settings.clone(), &ctx.api);
        run_view(&mut dashboard, &ctx.api)?;
        if !dashboard.logged_out {
            return Ok(());
        }
        message = Some("Signed out.".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_uses_first_name() {
        let g = pick_greeting("Ana Putri");
        assert!(g.starts_with("Hello, Ana. "));
        assert!(GREETINGS.iter().any(|r| g.ends_with(r)));
    }

    #[test]
    fn greeting_without_name_is_just_the_line() {
        let g = pick_greeting("  ");
        assert!(GREETINGS.contains(&g.as_str()));
    }
}
