use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::api::ApiClient;
use crate::cli::invoices::pdf_file_name;
use crate::error::Result;
use crate::fmt::{display_date, money};
use crate::listing::{filter_invoices, StatusFilter};
use crate::models::{Invoice, InvoiceStatus, User};
use crate::pagination::{self, PAGE_SIZE};
use crate::preview::PreviewData;
use crate::settings::{shellexpand_path, Settings};
use crate::tui::{clip, draw_chrome, draw_hints, status_style, Toast, BORDER_STYLE};

pub enum InvoiceAction {
    Continue,
    Close,
    New,
    Edit(Box<Invoice>),
}

enum Screen {
    List,
    Search,
    View { invoice: Box<Invoice>, scroll: u16 },
    Mark { selected: usize },
    ConfirmDelete,
}

pub struct InvoiceManager {
    invoices: Vec<Invoice>,
    search: String,
    filter: StatusFilter,
    page: usize,
    selection: usize,
    screen: Screen,
    toast: Toast,
    greeting: String,
    sender: Option<User>,
    currency: String,
    download_dir: String,
    /// Invoice the mark picker applies to.
    marked: Option<(i64, String)>,
}

impl InvoiceManager {
    pub fn new(api: &ApiClient, greeting: &str, sender: Option<User>, settings: &Settings) -> Self {
        let mut manager = Self {
            invoices: Vec::new(),
            search: String::new(),
            filter: StatusFilter::All,
            page: 1,
            selection: 0,
            screen: Screen::List,
            toast: Toast::default(),
            greeting: greeting.to_string(),
            sender,
            currency: settings.currency.clone(),
            download_dir: settings.download_dir.clone(),
            marked: None,
        };
        manager.reload(api);
        manager
    }

    pub fn reload(&mut self, api: &ApiClient) {
        match api.list_invoices() {
            Ok(invoices) => self.invoices = invoices,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load invoices");
                self.toast.set(format!("Failed to load invoices: {e}"));
            }
        }
        self.clamp();
    }

    pub fn set_toast(&mut self, msg: impl Into<String>) {
        self.toast.set(msg);
    }

    fn visible(&self) -> Vec<&Invoice> {
        filter_invoices(&self.invoices, &self.search, self.filter)
    }

    fn total_pages(&self) -> usize {
        pagination::total_pages(self.visible().len(), PAGE_SIZE)
    }

    fn page_rows(&self) -> Vec<&Invoice> {
        let visible = self.visible();
        pagination::page_slice(&visible, self.page, PAGE_SIZE).to_vec()
    }

    fn clamp(&mut self) {
        self.page = self.page.clamp(1, self.total_pages());
        let rows = self.page_rows().len();
        self.selection = if rows == 0 { 0 } else { self.selection.min(rows - 1) };
    }

    fn selected(&self) -> Option<&Invoice> {
        self.page_rows().get(self.selection).copied()
    }

    pub fn draw(&self, frame: &mut Frame) {
        let chrome = draw_chrome(frame, &self.greeting);

        if let Screen::View { invoice, scroll } = &self.screen {
            let preview = PreviewData::from_invoice(invoice, self.sender.as_ref());
            let width = chrome.content.width.saturating_sub(4);
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(BORDER_STYLE)
                .title(format!(" {} ", invoice.invoice_number));
            frame.render_widget(
                Paragraph::new(preview.to_lines(&self.currency, width))
                    .block(block)
                    .scroll((*scroll, 0)),
                chrome.content,
            );
            draw_hints(
                frame,
                chrome.hints,
                &self.toast,
                "↑/↓=scroll  e=edit  p=download PDF  s=send  m=mark  Esc=back",
            );
            return;
        }

        let [list_area, side_area] =
            Layout::horizontal([Constraint::Fill(1), Constraint::Length(24)]).areas(chrome.content);
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let dim = Style::default().fg(Color::DarkGray);

        let searching = matches!(self.screen, Screen::Search);
        let mut lines = vec![
            Line::from(""),
            Line::from(Span::styled(" Invoices", bold)),
            Line::from(""),
            Line::from(vec![
                Span::styled(
                    format!("   Search: {}{}", self.search, if searching { "_" } else { "" }),
                    if searching { Style::default().fg(Color::Cyan) } else { dim },
                ),
                Span::styled(format!("    Status: {}", self.filter.label()), dim),
            ]),
            Line::from(""),
        ];

        let rows = self.page_rows();
        if self.invoices.is_empty() {
            lines.push(Line::from("   No invoices yet. Press 'n' to create one."));
        } else if rows.is_empty() {
            lines.push(Line::from("   No invoices match your filters."));
        } else {
            lines.push(Line::from(Span::styled(
                format!(
                    "   {:<18} {:<22} {:<12} {:<9} {:>16}",
                    "Number", "Client", "Due", "Status", "Total"
                ),
                dim.add_modifier(Modifier::BOLD),
            )));
            for (i, inv) in rows.iter().enumerate() {
                let selected = i == self.selection;
                let marker = if selected { " > " } else { "   " };
                let row_style = if selected { bold } else { Style::default() };
                lines.push(Line::from(vec![
                    Span::styled(
                        format!(
                            "{marker}{:<18} {:<22} {:<12} ",
                            clip(&inv.invoice_number, 18),
                            clip(&inv.client_name, 22),
                            display_date(&inv.due_date)
                        ),
                        row_style,
                    ),
                    Span::styled(format!("{:<9}", inv.status.label()), status_style(inv.status)),
                    Span::styled(format!(" {:>16}", money(&self.currency, inv.total)), row_style),
                ]));
            }
            if self.total_pages() > 1 {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    format!("   {}", pagination::render(self.page, self.total_pages())),
                    dim,
                )));
            }
        }

        if let Screen::ConfirmDelete = &self.screen {
            if let Some(inv) = self.selected() {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    format!("   Delete invoice {}? (y/n)", inv.invoice_number),
                    Style::default().fg(Color::Yellow),
                )));
            }
        }
        frame.render_widget(Paragraph::new(lines), list_area);

        if let Screen::Mark { selected } = &self.screen {
            let mut side = vec![Line::from(""), Line::from(Span::styled(" Mark as", bold))];
            for (i, status) in InvoiceStatus::ALL.iter().enumerate() {
                let marker = if i == *selected { " > " } else { "   " };
                side.push(Line::from(Span::styled(
                    format!("{marker}{}", status.label()),
                    status_style(*status),
                )));
            }
            frame.render_widget(
                Paragraph::new(side).block(Block::default().borders(Borders::LEFT).border_style(BORDER_STYLE)),
                side_area,
            );
        }

        let hints = match self.screen {
            Screen::ConfirmDelete => "y=confirm  n=cancel",
            Screen::Search => "type to filter  Enter/Esc=done",
            Screen::Mark { .. } => "↑/↓=choose  Enter=apply  Esc=cancel",
            _ => "Enter=view  n=new  e=edit  p=PDF  s=send  m=mark  d=delete  /=search  f=status  Esc=back",
        };
        draw_hints(frame, chrome.hints, &self.toast, hints);
    }

    pub fn handle_key(&mut self, key: KeyEvent, api: &ApiClient) -> InvoiceAction {
        self.toast.tick();
        match self.screen {
            Screen::List => self.handle_list_key(key.code, api),
            Screen::Search => {
                self.handle_search_key(key.code);
                InvoiceAction::Continue
            }
            Screen::View { .. } => self.handle_view_key(key.code, api),
            Screen::Mark { .. } => {
                self.handle_mark_key(key.code, api);
                InvoiceAction::Continue
            }
            Screen::ConfirmDelete => {
                self.handle_delete_key(key.code, api);
                InvoiceAction::Continue
            }
        }
    }

    /// Shared by the list and the viewer: actions on one invoice.
    fn invoice_command(&mut self, code: KeyCode, invoice: &Invoice, api: &ApiClient) -> Option<InvoiceAction> {
        match code {
            KeyCode::Char('e') => return Some(InvoiceAction::Edit(Box::new(invoice.clone()))),
            KeyCode::Char('p') => match self.download(api, invoice) {
                Ok(path) => self.toast.set(format!("Invoice downloaded: {}", path.display())),
                Err(e) => self.toast.set(format!("Failed to download invoice: {e}")),
            },
            KeyCode::Char('s') => match api.send_invoice_email(invoice.id) {
                Ok(()) => {
                    self.toast.set("Invoice sent successfully");
                    self.reload(api);
                }
                Err(e) => self.toast.set(format!("Failed to send invoice: {e}")),
            },
            KeyCode::Char('m') => {
                let selected = InvoiceStatus::ALL
                    .iter()
                    .position(|s| *s == invoice.status)
                    .unwrap_or(0);
                self.marked = Some((invoice.id, invoice.invoice_number.clone()));
                self.screen = Screen::Mark { selected };
            }
            _ => return None,
        }
        Some(InvoiceAction::Continue)
    }

    fn download(&self, api: &ApiClient, invoice: &Invoice) -> Result<PathBuf> {
        let bytes = api.download_invoice(invoice.id)?;
        let dir = PathBuf::from(shellexpand_path(&self.download_dir));
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(pdf_file_name(&invoice.invoice_number));
        std::fs::write(&path, bytes)?;
        Ok(path)
    }

    fn handle_list_key(&mut self, code: KeyCode, api: &ApiClient) -> InvoiceAction {
        if let Some(invoice) = self.selected().cloned() {
            if let Some(action) = self.invoice_command(code, &invoice, api) {
                return action;
            }
        }
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
            KeyCode::Enter => {
                if let Some(inv) = self.selected() {
                    let id = inv.id;
                    match api.get_invoice(id) {
                        Ok(full) => {
                            self.screen = Screen::View {
                                invoice: Box::new(full),
                                scroll: 0,
                            }
                        }
                        Err(e) => self.toast.set(format!("Failed to load invoice: {e}")),
                    }
                }
            }
            KeyCode::Char('n') => return InvoiceAction::New,
            KeyCode::Char('/') => self.screen = Screen::Search,
            KeyCode::Char('f') => {
                self.filter = self.filter.next();
                self.page = 1;
                self.selection = 0;
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
            KeyCode::Char('q') | KeyCode::Esc => return InvoiceAction::Close,
            _ => {}
        }
        InvoiceAction::Continue
    }

    fn handle_view_key(&mut self, code: KeyCode, api: &ApiClient) -> InvoiceAction {
        let Screen::View { invoice, scroll } = &mut self.screen else {
            return InvoiceAction::Continue;
        };
        match code {
            KeyCode::Up => *scroll = scroll.saturating_sub(1),
            KeyCode::Down => *scroll = scroll.saturating_add(1),
            KeyCode::Esc | KeyCode::Char('q') => self.screen = Screen::List,
            _ => {
                let invoice = invoice.as_ref().clone();
                if let Some(action) = self.invoice_command(code, &invoice, api) {
                    return action;
                }
            }
        }
        InvoiceAction::Continue
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

    fn target(&self) -> Option<(i64, String)> {
        self.selected().map(|i| (i.id, i.invoice_number.clone()))
    }

    fn handle_mark_key(&mut self, code: KeyCode, api: &ApiClient) {
        let Screen::Mark { selected } = &mut self.screen else {
            return;
        };
        match code {
            KeyCode::Up => *selected = selected.saturating_sub(1),
            KeyCode::Down => *selected = (*selected + 1).min(InvoiceStatus::ALL.len() - 1),
            KeyCode::Esc => {
                self.marked = None;
                self.screen = Screen::List;
            }
            KeyCode::Enter => {
                let status = InvoiceStatus::ALL[*selected];
                self.screen = Screen::List;
                if let Some((id, number)) = self.marked.take().or_else(|| self.target()) {
                    match api.set_invoice_status(id, status) {
                        Ok(()) => {
                            self.reload(api);
                            self.toast.set(format!("{number} marked as {}", status.label()));
                        }
                        Err(e) => self.toast.set(format!("Failed to update {number}: {e}")),
                    }
                }
            }
            _ => {}
        }
    }

    fn handle_delete_key(&mut self, code: KeyCode, api: &ApiClient) {
        match code {
            KeyCode::Char('y') => {
                self.screen = Screen::List;
                if let Some((id, number)) = self.target() {
                    match api.delete_invoice(id) {
                        Ok(()) => {
                            self.reload(api);
                            self.toast.set(format!("Deleted invoice {number}"));
                        }
                        Err(e) => self.toast.set(format!("Failed to delete {number}: {e}")),
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

    fn offline() -> ApiClient {
        ApiClient::new("http://127.0.0.1:9").unwrap()
    }

    fn invoice(id: i64, status: InvoiceStatus) -> Invoice {
        Invoice {
            id,
            invoice_number: format!("INV-{id:03}"),
            client_name: "Acme".into(),
            due_date: "2026-11-01".into(),
            status,
            ..Invoice::default()
        }
    }

    /// 25 invoices, every other one a draft.
    fn manager() -> InvoiceManager {
        let mut m = InvoiceManager::new(&offline(), "hi", None, &Settings::default());
        m.invoices = (1..=25)
            .map(|id| {
                let status = if id % 2 == 1 { InvoiceStatus::Draft } else { InvoiceStatus::Sent };
                invoice(id, status)
            })
            .collect();
        m.clamp();
        m
    }

    fn press(m: &mut InvoiceManager, code: KeyCode) -> InvoiceAction {
        m.handle_key(KeyEvent::from(code), &offline())
    }

    #[test]
    fn failed_load_is_a_toast() {
        let m = InvoiceManager::new(&offline(), "hi", None, &Settings::default());
        assert!(m.invoices.is_empty());
        assert!(m.toast.message().is_some_and(|t| t.starts_with("Failed to load invoices")));
    }

    #[test]
    fn status_filter_resets_paging() {
        let mut m = manager();
        assert_eq!(m.total_pages(), 3);
        press(&mut m, KeyCode::Right);
        press(&mut m, KeyCode::Right);
        press(&mut m, KeyCode::Right);
        assert_eq!(m.page, 3);
        assert_eq!(m.page_rows().len(), 5);

        press(&mut m, KeyCode::Char('f'));
        assert_eq!(m.filter, StatusFilter::Only(InvoiceStatus::Draft));
        assert_eq!(m.page, 1);
        assert_eq!(m.total_pages(), 2);
        press(&mut m, KeyCode::Right);
        press(&mut m, KeyCode::Right);
        assert_eq!(m.page, 2);
        assert_eq!(m.selected().map(|i| i.id), Some(21));

        for _ in 0..4 {
            press(&mut m, KeyCode::Char('f'));
        }
        assert_eq!(m.filter, StatusFilter::All);
        assert_eq!(m.total_pages(), 3);
    }

    #[test]
    fn search_narrows_and_resets_selection() {
        let mut m = manager();
        press(&mut m, KeyCode::Down);
        press(&mut m, KeyCode::Char('/'));
        for c in "inv-01".chars() {
            press(&mut m, KeyCode::Char(c));
        }
        press(&mut m, KeyCode::Enter);
        assert!(matches!(m.screen, Screen::List));
        assert_eq!(m.visible().len(), 10);
        assert_eq!(m.selection, 0);
    }

    #[test]
    fn mark_applies_to_the_viewed_invoice() {
        let mut m = manager();
        assert_eq!(m.selected().map(|i| i.id), Some(1));
        m.screen = Screen::View {
            invoice: Box::new(invoice(7, InvoiceStatus::Sent)),
            scroll: 0,
        };
        press(&mut m, KeyCode::Char('m'));
        assert_eq!(m.marked, Some((7, "INV-007".to_string())));
        let Screen::Mark { selected } = m.screen else {
            panic!("expected the status picker");
        };
        assert_eq!(InvoiceStatus::ALL[selected], InvoiceStatus::Sent);

        press(&mut m, KeyCode::Down);
        press(&mut m, KeyCode::Enter);
        assert!(matches!(m.screen, Screen::List));
        assert!(m.marked.is_none());
        // offline, so the update fails, but it named the viewed invoice
        assert!(m.toast.message().is_some_and(|t| t.starts_with("Failed to update INV-007")));
    }

    #[test]
    fn escaping_the_picker_forgets_the_target() {
        let mut m = manager();
        press(&mut m, KeyCode::Char('m'));
        assert_eq!(m.marked, Some((1, "INV-001".to_string())));
        press(&mut m, KeyCode::Esc);
        assert!(matches!(m.screen, Screen::List));
        assert!(m.marked.is_none());
    }

    #[test]
    fn delete_asks_first() {
        let mut m = manager();
        press(&mut m, KeyCode::Down);
        press(&mut m, KeyCode::Char('d'));
        assert!(matches!(m.screen, Screen::ConfirmDelete));
        press(&mut m, KeyCode::Char('n'));
        assert!(matches!(m.screen, Screen::List));
        assert_eq!(m.invoices.len(), 25);

        press(&mut m, KeyCode::Char('d'));
        press(&mut m, KeyCode::Char('y'));
        assert!(matches!(m.screen, Screen::List));
        assert!(m.toast.message().is_some_and(|t| t.starts_with("Failed to delete INV-002")));
    }

    #[test]
    fn nothing_to_delete_on_an_empty_list() {
        let mut m = manager();
        m.invoices.clear();
        m.clamp();
        press(&mut m, KeyCode::Char('d'));
        assert!(matches!(m.screen, Screen::List));
    }

    #[test]
    fn shrinking_list_clamps_page_and_selection() {
        let mut m = manager();
        press(&mut m, KeyCode::Right);
        press(&mut m, KeyCode::Right);
        for _ in 0..4 {
            press(&mut m, KeyCode::Down);
        }
        assert_eq!((m.page, m.selection), (3, 4));
        m.invoices.truncate(13);
        m.clamp();
        assert_eq!(m.page, 2);
        assert_eq!(m.selection, 2);
        assert_eq!(m.selected().map(|i| i.id), Some(13));
    }

    #[test]
    fn list_keys_route_to_the_dashboard() {
        let mut m = manager();
        assert!(matches!(press(&mut m, KeyCode::Char('n')), InvoiceAction::New));
        match press(&mut m, KeyCode::Char('e')) {
            InvoiceAction::Edit(inv) => assert_eq!(inv.id, 1),
            _ => panic!("expected edit"),
        }
        assert!(matches!(press(&mut m, KeyCode::Esc), InvoiceAction::Close));
    }
}
