use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::api::ApiClient;
use crate::error::PennyError;
use crate::form::{Form, FormEvent, FormField};
use crate::listing::filter_clients;
use crate::models::{Client, ClientInput};
use crate::pagination::{self, PAGE_SIZE};
use crate::tui::{clip, draw_chrome, draw_hints, Toast};
use crate::validate;

pub enum ClientAction {
    Continue,
    Close,
}

enum Screen {
    List,
    Search,
    Add(Form),
    Edit(i64, Form),
    ConfirmDelete,
}

fn client_form(client: Option<&Client>) -> Form {
    let opt = |v: Option<&Option<String>>| {
        v.and_then(|o| o.as_deref()).unwrap_or("").to_string()
    };
    Form::new(vec![
        FormField::text("name", "Name", client.map(|c| c.name.as_str()).unwrap_or("")),
        FormField::text("email", "Email", &opt(client.map(|c| &c.email))),
        FormField::text("phone", "Phone", &opt(client.map(|c| &c.phone))),
        FormField::text("address", "Address", &opt(client.map(|c| &c.address))),
    ])
}

pub fn form_input(form: &Form) -> Result<ClientInput, PennyError> {
    let input = ClientInput {
        name: form.value("name").trim().to_string(),
        email: form.optional("email"),
        phone: form.optional("phone"),
        address: form.optional("address"),
    };
    validate::client(&input.name, input.email.as_deref().unwrap_or(""))?;
    Ok(input)
}

pub struct ClientManager {
    clients: Vec<Client>,
    search: String,
    page: usize,
    selection: usize,
    screen: Screen,
    toast: Toast,
    greeting: String,
}

impl ClientManager {
    pub fn new(api: &ApiClient, greeting: &str) -> Self {
        let mut manager = Self {
            clients: Vec::new(),
            search: String::new(),
            page: 1,
            selection: 0,
            screen: Screen::List,
            toast: Toast::default(),
            greeting: greeting.to_string(),
        };
        manager.reload(api);
        manager
    }

    fn reload(&mut self, api: &ApiClient) {
        match api.list_clients() {
            Ok(clients) => self.clients = clients,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load clients");
                self.toast.set(format!("Failed to load clients: {e}"));
            }
        }
        self.clamp();
    }

    fn visible(&self) -> Vec<&Client> {
        filter_clients(&self.clients, &self.search)
    }

    fn total_pages(&self) -> usize {
        pagination::total_pages(self.visible().len(), PAGE_SIZE)
    }

    fn page_rows(&self) -> Vec<&Client> {
        let visible = self.visible();
        pagination::page_slice(&visible, self.page, PAGE_SIZE).to_vec()
    }

    fn clamp(&mut self) {
        self.page = self.page.clamp(1, self.total_pages());
        let rows = self.page_rows().len();
        self.selection = if rows == 0 { 0 } else { self.selection.min(rows - 1) };
    }

    fn selected(&self) -> Option<&Client> {
        self.page_rows().get(self.selection).copied()
    }

    pub fn draw(&self, frame: &mut Frame) {
        let chrome = draw_chrome(frame, &self.greeting);
        let bold = Style::default().add_modifier(Modifier::BOLD);

        let title = match &self.screen {
            Screen::Add(_) => "Add Client",
            Screen::Edit(..) => "Edit Client",
            _ => "Clients",
        };
        let mut lines = vec![
            Line::from(""),
            Line::from(Span::styled(format!(" {title}"), bold)),
            Line::from(""),
        ];

        match &self.screen {
            Screen::Add(form) | Screen::Edit(_, form) => {
                lines.extend(form.lines());
                frame.render_widget(Paragraph::new(lines), chrome.content);
                draw_hints(
                    frame,
                    chrome.hints,
                    &self.toast,
                    "Tab=next field  Enter=save  Esc=cancel",
                );
                return;
            }
            _ => {}
        }

        let search_style = if matches!(self.screen, Screen::Search) {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let cursor = if matches!(self.screen, Screen::Search) { "_" } else { "" };
        lines.push(Line::from(Span::styled(
            format!("   Search: {}{cursor}", self.search),
            search_style,
        )));
        lines.push(Line::from(""));

        let rows = self.page_rows();
        if self.clients.is_empty() {
            lines.push(Line::from("   No clients yet. Press 'a' to add one."));
        } else if rows.is_empty() {
            lines.push(Line::from("   No clients match your search."));
        } else {
            lines.push(Line::from(Span::styled(
                format!("   {:<24} {:<28} {:<16} {}", "Name", "Email", "Phone", "Address"),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD),
            )));
            for (i, c) in rows.iter().enumerate() {
                let marker = if i == self.selection { " > " } else { "   " };
                let style = if i == self.selection { bold } else { Style::default() };
                lines.push(Line::from(Span::styled(
                    format!(
                        "{marker}{:<24} {:<28} {:<16} {}",
                        clip(&c.name, 24),
                        clip(c.email.as_deref().unwrap_or(""), 28),
                        clip(c.phone.as_deref().unwrap_or(""), 16),
                        c.address.as_deref().unwrap_or("")
                    ),
                    style,
                )));
            }
            if self.total_pages() > 1 {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    format!("   {}", pagination::render(self.page, self.total_pages())),
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }

        if let Screen::ConfirmDelete = &self.screen {
            if let Some(c) = self.selected() {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    format!("   Delete '{}'? (y/n)", c.name),
                    Style::default().fg(Color::Yellow),
                )));
            }
        }

        frame.render_widget(Paragraph::new(lines), chrome.content);
        let hints = match self.screen {
            Screen::ConfirmDelete => "y=confirm  n=cancel",
            Screen::Search => "type to filter  Enter/Esc=done",
            _ => "a=add  e=edit  d=delete  /=search  ←/→=page  r=refresh  Esc=back",
        };
        draw_hints(frame, chrome.hints, &self.toast, hints);
    }

    pub fn handle_key(&mut self, key: KeyEvent, api: &ApiClient) -> ClientAction {
        self.toast.tick();
        match self.screen {
            Screen::List => return self.handle_list_key(key.code, api),
            Screen::Search => self.handle_search_key(key.code),
            Screen::Add(_) | Screen::Edit(..) => self.handle_form_key(key.code, api),
            Screen::ConfirmDelete => self.handle_delete_key(key.code, api),
        }
        ClientAction::Continue
    }

    fn handle_list_key(&mut self, code: KeyCode, api: &ApiClient) -> ClientAction {
        match code {
            KeyCode::Up => self.selection = self.selection.saturating_sub(1),
            KeyCode::Down => {
                let rows = self.page_rows().len();
                if rows > 0 {
                    self.selection = (self.selection + 1).min(rows - 1);
                }
            }
            KeyCode::Left | KeyCode::PageUp => {
                self.page = self.page.saturating_sub(1).max(1);
                self.selection = 0;
            }
            KeyCode::Right | KeyCode::PageDown => {
                self.page = (self.page + 1).min(self.total_pages());
                self.selection = 0;
            }
            KeyCode::Char('/') => self.screen = Screen::Search,
            KeyCode::Char('a') => self.screen = Screen::Add(client_form(None)),
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(c) = self.selected() {
                    self.screen = Screen::Edit(c.id, client_form(Some(c)));
                }
            }
            KeyCode::Char('d') => {
                if self.selected().is_some() {
                    self.screen = Screen::ConfirmDelete;
                }
            }
            KeyCode::Char('r') => {
                self.reload(api);
                self.toast.set("Refreshed");
            }
            KeyCode::Char('q') | KeyCode::Esc => return ClientAction::Close,
            _ => {}
        }
        ClientAction::Continue
    }

    fn handle_search_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Enter | KeyCode::Esc => self.screen = Screen::List,
            KeyCode::Char(c) => self.search.push(c),
            KeyCode::Backspace => {
                self.search.pop();
            }
            _ => return,
        }
        self.page = 1;
        self.selection = 0;
    }

    fn handle_form_key(&mut self, code: KeyCode, api: &ApiClient) {
        let (id, form) = match &mut self.screen {
            Screen::Add(f) => (None, f),
            Screen::Edit(id, f) => (Some(*id), f),
            _ => return,
        };
        match form.handle_key(code) {
            FormEvent::Cancel => self.screen = Screen::List,
            FormEvent::Submit => {
                let input = match form_input(form) {
                    Ok(input) => input,
                    Err(PennyError::Validation(errors)) => {
                        form.set_errors(errors);
                        return;
                    }
                    Err(e) => {
                        self.toast.set(e.to_string());
                        return;
                    }
                };
                let result = match id {
                    Some(id) => api.update_client(id, &input),
                    None => api.create_client(&input),
                };
                match result {
                    Ok(()) => {
                        let verb = if id.is_some() { "updated" } else { "created" };
                        self.screen = Screen::List;
                        self.reload(api);
                        self.toast.set(format!("Client {verb} successfully"));
                    }
                    Err(e) => self.toast.set(e.to_string()),
                }
            }
            FormEvent::Changed | FormEvent::None => {}
        }
    }

    fn handle_delete_key(&mut self, code: KeyCode, api: &ApiClient) {
        match code {
            KeyCode::Char('y') => {
                if let Some((id, name)) = self.selected().map(|c| (c.id, c.name.clone())) {
                    self.screen = Screen::List;
                    match api.delete_client(id) {
                        Ok(()) => {
                            self.reload(api);
                            self.toast.set(format!("Deleted client: {name}"));
                        }
                        Err(e) => self.toast.set(e.to_string()),
                    }
                }
            }
            KeyCode::Char('n') | KeyCode::Esc => self.screen = Screen::List,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_input_drops_blank_optionals() {
        let c = Client {
            id: 1,
            name: "Acme".into(),
            email: Some("ap@acme.test".into()),
            phone: None,
            address: Some("".into()),
        };
        let input = form_input(&client_form(Some(&c))).unwrap();
        assert_eq!(input.name, "Acme");
        assert_eq!(input.email.as_deref(), Some("ap@acme.test"));
        assert_eq!(input.phone, None);
        assert_eq!(input.address, None);
    }

    #[test]
    fn blank_name_is_a_field_error() {
        let err = form_input(&client_form(None)).unwrap_err();
        match err {
            PennyError::Validation(errors) => assert_eq!(errors[0].field, "name"),
            other => panic!("unexpected {other}"),
        }
    }
}
