//! Create/edit screen: the invoice form on the left and a live preview on the
//! right. The preview is rebuilt once typing pauses, not on every keystroke.

use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::api::ApiClient;
use crate::fmt::money;
use crate::invoice_form::{HeaderField, InvoiceForm, ItemField, PreviewDebounce};
use crate::listing::filter_clients;
use crate::models::{Client, Invoice, User};
use crate::preview::PreviewData;
use crate::tui::{clip, draw_chrome, draw_hints, Toast, AMOUNT_STYLE, BORDER_STYLE, SELECTED_STYLE};

pub enum EditorAction {
    Continue,
    Close,
    /// Saved; carries the message for the screen we return to.
    Saved(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Header(HeaderField),
    Item(usize, ItemField),
}

struct ClientPicker {
    clients: Vec<Client>,
    search: String,
    selection: usize,
}

impl ClientPicker {
    fn visible(&self) -> Vec<&Client> {
        filter_clients(&self.clients, &self.search)
    }
}

pub struct InvoiceEditor {
    form: InvoiceForm,
    invoice_id: Option<i64>,
    focus: usize,
    preview: PreviewData,
    debounce: PreviewDebounce,
    sender: Option<User>,
    currency: String,
    picker: Option<ClientPicker>,
    toast: Toast,
}

impl InvoiceEditor {
    pub fn create(sender: Option<User>, currency: &str, due_in_days: i64, tax_rate: f64) -> Self {
        Self::with_form(InvoiceForm::blank_now(due_in_days, tax_rate), None, sender, currency)
    }

    pub fn edit(invoice: &Invoice, sender: Option<User>, currency: &str) -> Self {
        Self::with_form(InvoiceForm::from_invoice(invoice), Some(invoice.id), sender, currency)
    }

    fn with_form(form: InvoiceForm, invoice_id: Option<i64>, sender: Option<User>, currency: &str) -> Self {
        let preview = form.preview(sender.as_ref());
        Self {
            form,
            invoice_id,
            focus: 0,
            preview,
            debounce: PreviewDebounce::default(),
            sender,
            currency: currency.to_string(),
            picker: None,
            toast: Toast::default(),
        }
    }

    fn field_count(&self) -> usize {
        HeaderField::ALL.len() + self.form.items.len() * ItemField::ALL.len()
    }

    fn target(&self) -> Target {
        let headers = HeaderField::ALL.len();
        if self.focus < headers {
            Target::Header(HeaderField::ALL[self.focus])
        } else {
            let offset = self.focus - headers;
            let cols = ItemField::ALL.len();
            Target::Item(offset / cols, ItemField::ALL[offset % cols])
        }
    }

    fn focus_item(&mut self, row: usize) {
        self.focus = HeaderField::ALL.len() + row * ItemField::ALL.len();
    }

    fn changed(&mut self) {
        self.debounce.touch(Instant::now());
    }

    /// Event poll timeout: only wait as long as a pending refresh allows.
    pub fn poll_timeout(&self, now: Instant) -> Option<Duration> {
        self.debounce.remaining(now)
    }

    pub fn tick(&mut self, now: Instant) {
        if self.debounce.due(now) {
            self.preview = self.form.preview(self.sender.as_ref());
            self.debounce.settle();
        }
    }

    fn value_line(&self, label: &str, value: &str, focused: bool) -> Line<'static> {
        let cursor = if focused { "_" } else { "" };
        let style = if focused { SELECTED_STYLE } else { Style::default() };
        Line::from(vec![
            Span::styled(format!("  {label:<16}"), Style::default().fg(Color::DarkGray)),
            Span::styled(format!("{value}{cursor}"), style),
        ])
    }

    fn form_lines(&self, width: usize) -> Vec<Line<'static>> {
        let current = self.target();
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let mut lines = vec![Line::from("")];

        for (i, field) in HeaderField::ALL.iter().enumerate() {
            if i == 3 {
                lines.push(Line::from(""));
                let heading = if self.form.client_id.is_some() {
                    " Bill To (saved client)"
                } else {
                    " Bill To"
                };
                lines.push(Line::from(Span::styled(heading, bold)));
            }
            let value = clip(self.form.get(*field), width.saturating_sub(20));
            lines.push(self.value_line(field.label(), &value, current == Target::Header(*field)));
        }

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(" Items", bold)));
        for (row, item) in self.form.items.iter().enumerate() {
            let mut spans = vec![Span::raw(format!("  {:>2}. ", row + 1))];
            for field in ItemField::ALL {
                let focused = current == Target::Item(row, field);
                let raw = item.get(field);
                let shown = if raw.is_empty() && !focused {
                    field.label().to_string()
                } else {
                    raw.to_string()
                };
                let style = if focused {
                    SELECTED_STYLE
                } else if raw.is_empty() {
                    Style::default().fg(Color::DarkGray)
                } else {
                    Style::default()
                };
                let cursor = if focused { "_" } else { "" };
                spans.push(Span::styled(format!("{shown}{cursor}"), style));
                spans.push(Span::raw("  "));
            }
            spans.push(Span::styled(money(&self.currency, item.total()), AMOUNT_STYLE));
            lines.push(Line::from(spans));
        }

        let totals = self.form.totals();
        lines.push(Line::from(""));
        lines.push(Line::from(format!(
            "  Subtotal {}   Tax {}   Total {}",
            money(&self.currency, totals.subtotal),
            money(&self.currency, totals.tax),
            money(&self.currency, totals.total)
        )));
        lines
    }

    pub fn draw(&self, frame: &mut Frame) {
        let title = match self.invoice_id {
            Some(_) => format!("Edit {}", self.form.invoice_number),
            None => "New Invoice".to_string(),
        };
        let chrome = draw_chrome(frame, &title);
        let [left, right] =
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(chrome.content);

        if let Some(picker) = &self.picker {
            let mut lines = vec![
                Line::from(""),
                Line::from(Span::styled(" Pick a client", Style::default().add_modifier(Modifier::BOLD))),
                Line::from(Span::styled(
                    format!("   Search: {}_", picker.search),
                    Style::default().fg(Color::Cyan),
                )),
                Line::from(""),
            ];
            let visible = picker.visible();
            if visible.is_empty() {
                lines.push(Line::from("   No clients match."));
            }
            for (i, c) in visible.iter().enumerate() {
                let selected = i == picker.selection;
                lines.push(Line::from(Span::styled(
                    format!(
                        "{}{}  {}",
                        if selected { " > " } else { "   " },
                        c.name,
                        c.email.as_deref().unwrap_or("")
                    ),
                    if selected { SELECTED_STYLE } else { Style::default() },
                )));
            }
            frame.render_widget(Paragraph::new(lines), left);
        } else {
            frame.render_widget(Paragraph::new(self.form_lines(left.width as usize)), left);
        }

        let pending = if self.debounce.is_pending() { " Preview … " } else { " Preview " };
        let block = Block::default()
            .borders(Borders::LEFT)
            .border_style(BORDER_STYLE)
            .title(pending);
        frame.render_widget(
            Paragraph::new(self.preview.to_lines(&self.currency, right.width.saturating_sub(2))).block(block),
            right,
        );

        let hints = if self.picker.is_some() {
            "type to search  ↑/↓=choose  Enter=select  Esc=back"
        } else {
            "Tab=next  Ctrl+A=add item  Ctrl+D=remove item  Ctrl+P=pick client  Ctrl+S=save  Esc=cancel"
        };
        draw_hints(frame, chrome.hints, &self.toast, hints);
    }

    pub fn handle_key(&mut self, key: KeyEvent, api: &ApiClient) -> EditorAction {
        self.toast.tick();
        if self.picker.is_some() {
            self.handle_picker_key(key.code);
            return EditorAction::Continue;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('a') => {
                    let row = self.form.add_item();
                    self.focus_item(row);
                    self.changed();
                }
                KeyCode::Char('d') => self.remove_item(),
                KeyCode::Char('p') => self.open_picker(api),
                KeyCode::Char('s') => return self.save(api),
                _ => {}
            }
            return EditorAction::Continue;
        }

        let count = self.field_count();
        match key.code {
            KeyCode::Esc => return EditorAction::Close,
            KeyCode::Tab | KeyCode::Down | KeyCode::Enter => self.focus = (self.focus + 1) % count,
            KeyCode::BackTab | KeyCode::Up => self.focus = (self.focus + count - 1) % count,
            KeyCode::Char(c) => {
                match self.target() {
                    Target::Header(field) => self.form.push_char(field, c),
                    Target::Item(row, field) => self.form.push_item_char(row, field, c),
                }
                self.changed();
            }
            KeyCode::Backspace => {
                match self.target() {
                    Target::Header(field) => self.form.pop_char(field),
                    Target::Item(row, field) => self.form.pop_item_char(row, field),
                }
                self.changed();
            }
            _ => {}
        }
        EditorAction::Continue
    }

    fn remove_item(&mut self) {
        let row = match self.target() {
            Target::Item(row, _) => row,
            Target::Header(_) => self.form.items.len().saturating_sub(1),
        };
        if self.form.remove_item(row) {
            self.focus = self.focus.min(self.field_count() - 1);
            self.changed();
        } else {
            self.toast.set("An invoice needs at least one item");
        }
    }

    fn open_picker(&mut self, api: &ApiClient) {
        match api.list_clients() {
            Ok(clients) if clients.is_empty() => self.toast.set("No saved clients yet"),
            Ok(clients) => {
                self.picker = Some(ClientPicker {
                    clients,
                    search: String::new(),
                    selection: 0,
                })
            }
            Err(e) => self.toast.set(format!("Failed to load clients: {e}")),
        }
    }

    fn handle_picker_key(&mut self, code: KeyCode) {
        let Some(picker) = self.picker.as_mut() else {
            return;
        };
        match code {
            KeyCode::Esc => self.picker = None,
            KeyCode::Up => picker.selection = picker.selection.saturating_sub(1),
            KeyCode::Down => {
                let n = picker.visible().len();
                if n > 0 {
                    picker.selection = (picker.selection + 1).min(n - 1);
                }
            }
            KeyCode::Char(c) => {
                picker.search.push(c);
                picker.selection = 0;
            }
            KeyCode::Backspace => {
                picker.search.pop();
                picker.selection = 0;
            }
            KeyCode::Enter => {
                let chosen = picker.visible().get(picker.selection).map(|c| (*c).clone());
                if let Some(client) = chosen {
                    self.form.select_client(&client);
                    self.picker = None;
                    self.changed();
                    self.toast.set(format!("Billing {}", client.name));
                }
            }
            _ => {}
        }
    }

    fn save(&mut self, api: &ApiClient) -> EditorAction {
        if !self.form.is_valid() {
            self.toast.set(self.form.missing_fields_message());
            return EditorAction::Continue;
        }
        let result = match self.invoice_id {
            Some(id) => api.update_invoice(id, &self.form.draft_request()),
            None => api.create_invoice(&self.form.draft_request()),
        };
        match result {
            Ok(()) => {
                let verb = if self.invoice_id.is_some() { "updated" } else { "created" };
                tracing::info!(number = %self.form.invoice_number, verb, "invoice saved");
                EditorAction::Saved(format!("Invoice {verb} successfully"))
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to save invoice");
                self.toast.set(format!("Failed to save invoice: {e}"));
                EditorAction::Continue
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor() -> InvoiceEditor {
        InvoiceEditor::create(None, "IDR", 30, 11.0)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn offline() -> ApiClient {
        ApiClient::new("http://127.0.0.1:9").unwrap()
    }

    #[test]
    fn focus_walks_headers_then_item_cells() {
        let mut ed = editor();
        assert_eq!(ed.target(), Target::Header(HeaderField::InvoiceNumber));
        ed.focus = HeaderField::ALL.len() + 1;
        assert_eq!(ed.target(), Target::Item(0, ItemField::Quantity));
        ed.focus = ed.field_count() - 1;
        ed.handle_key(key(KeyCode::Tab), &offline());
        assert_eq!(ed.focus, 0);
        ed.handle_key(key(KeyCode::BackTab), &offline());
        assert_eq!(ed.target(), Target::Item(0, ItemField::UnitPrice));
    }

    #[test]
    fn typing_defers_preview_until_quiet() {
        let mut ed = editor();
        let api = offline();
        ed.focus_item(0);
        for c in "Logo".chars() {
            ed.handle_key(key(KeyCode::Char(c)), &api);
        }
        assert_eq!(ed.form.items[0].description, "Logo");
        assert!(ed.debounce.is_pending());
        assert!(ed.preview.items[0].description.is_empty());

        ed.tick(Instant::now() + Duration::from_secs(1));
        assert!(!ed.debounce.is_pending());
        assert_eq!(ed.preview.items[0].description, "Logo");
    }

    #[test]
    fn ctrl_a_adds_a_row_and_ctrl_d_keeps_the_last_one() {
        let mut ed = editor();
        let api = offline();
        ed.handle_key(ctrl('a'), &api);
        assert_eq!(ed.form.items.len(), 2);
        assert_eq!(ed.target(), Target::Item(1, ItemField::Description));

        ed.handle_key(ctrl('d'), &api);
        assert_eq!(ed.form.items.len(), 1);
        ed.handle_key(ctrl('d'), &api);
        assert_eq!(ed.form.items.len(), 1);
        assert_eq!(ed.toast.message(), Some("An invoice needs at least one item"));
    }

    #[test]
    fn incomplete_invoice_is_not_sent() {
        let mut ed = editor();
        match ed.handle_key(ctrl('s'), &offline()) {
            EditorAction::Continue => {}
            _ => panic!("incomplete invoice should not save"),
        }
        assert_eq!(ed.toast.message(), Some(ed.form.missing_fields_message()));
    }

    #[test]
    fn picking_a_client_fills_bill_to() {
        let mut ed = editor();
        ed.picker = Some(ClientPicker {
            clients: vec![
                Client {
                    id: 4,
                    name: "Acme".into(),
                    email: Some("ap@acme.test".into()),
                    ..Client::default()
                },
                Client {
                    id: 7,
                    name: "Globex".into(),
                    ..Client::default()
                },
            ],
            search: String::new(),
            selection: 0,
        });
        ed.handle_key(key(KeyCode::Char('g')), &offline());
        ed.handle_key(key(KeyCode::Enter), &offline());
        assert!(ed.picker.is_none());
        assert_eq!(ed.form.client_id, Some(7));
        assert_eq!(ed.form.client_name, "Globex");
    }
}
