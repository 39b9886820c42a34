use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::api::ApiClient;
use crate::error::Result;
use crate::models::InvoiceStatus;

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Yellow)
    .add_modifier(Modifier::BOLD);

pub const FOOTER_STYLE: Style = Style::new().fg(Color::DarkGray);

pub const BORDER_STYLE: Style = Style::new().fg(Color::DarkGray);

pub const TOAST_STYLE: Style = Style::new().fg(Color::Yellow);

pub const ERROR_STYLE: Style = Style::new().fg(Color::Red);

pub const SELECTED_STYLE: Style = Style::new()
    .bg(Color::Rgb(40, 40, 60))
    .add_modifier(Modifier::BOLD);

pub const AMOUNT_STYLE: Style = Style::new().fg(Color::Rgb(80, 220, 100));

pub fn status_style(status: InvoiceStatus) -> Style {
    let color = match status {
        InvoiceStatus::Draft => Color::Gray,
        InvoiceStatus::Sent => Color::Blue,
        InvoiceStatus::Paid => Color::Rgb(80, 220, 100),
        InvoiceStatus::Overdue => Color::Red,
    };
    Style::new().fg(color).add_modifier(Modifier::BOLD)
}

/// Transient status line. Cleared after a few keypresses.
#[derive(Debug, Default)]
pub struct Toast {
    message: Option<String>,
    ttl: u8,
}

impl Toast {
    const KEYPRESSES: u8 = 3;

    pub fn set(&mut self, msg: impl Into<String>) {
        self.message = Some(msg.into());
        self.ttl = Self::KEYPRESSES;
    }

    /// Call once per keypress, before the key is handled.
    pub fn tick(&mut self) {
        if self.ttl > 0 {
            self.ttl -= 1;
            if self.ttl == 0 {
                self.message = None;
            }
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Header, separator, content and hint rows shared by every screen.
pub struct Chrome {
    pub content: Rect,
    pub hints: Rect,
}

pub fn draw_chrome(frame: &mut Frame, header: &str) -> Chrome {
    let area = frame.area();
    let [header_area, sep, content, hints] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(area);

    frame.render_widget(
        Paragraph::new(format!(" Penny: {header}")).style(HEADER_STYLE),
        header_area,
    );
    let sep_line = "━".repeat(area.width as usize);
    frame.render_widget(Paragraph::new(sep_line).style(BORDER_STYLE), sep);
    Chrome { content, hints }
}

/// Footer row: the toast wins over the key hints while it is alive.
pub fn draw_hints(frame: &mut Frame, area: Rect, toast: &Toast, hints: &str) {
    let widget = match toast.message() {
        Some(msg) => Paragraph::new(format!(" {msg}")).style(TOAST_STYLE),
        None => Paragraph::new(format!(" {hints}")).style(FOOTER_STYLE),
    };
    frame.render_widget(widget, area);
}

pub fn is_ctrl_c(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
}

/// Truncate to `width` chars, marking the cut with an ellipsis.
pub fn clip(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else if width == 0 {
        String::new()
    } else {
        let mut s: String = text.chars().take(width - 1).collect();
        s.push('…');
        s
    }
}

pub enum ViewAction {
    Continue,
    Close,
}

pub trait View {
    fn draw(&mut self, frame: &mut Frame);
    fn handle_key(&mut self, key: KeyEvent, api: &ApiClient) -> ViewAction;
    /// How long the loop may block waiting for input. `None` blocks until a
    /// key arrives.
    fn poll_timeout(&self, _now: Instant) -> Option<Duration> {
        None
    }
    /// Called when the poll timeout elapses without input.
    fn tick(&mut self, _now: Instant) {}
}

/// Run an interactive view until it closes. Sets up the terminal and panic
/// hook, then restores the terminal on exit.
pub fn run_view(view: &mut dyn View, api: &ApiClient) -> Result<()> {
    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        ratatui::restore();
        hook(info);
    }));

    let mut terminal = ratatui::init();

    let result: Result<()> = loop {
        if let Err(e) = terminal.draw(|frame| view.draw(frame)) {
            break Err(e.into());
        }

        if let Some(timeout) = view.poll_timeout(Instant::now()) {
            match event::poll(timeout) {
                Ok(true) => {}
                Ok(false) => {
                    view.tick(Instant::now());
                    continue;
                }
                Err(e) => break Err(e.into()),
            }
        }

        match event::read() {
            Err(e) => break Err(e.into()),
            Ok(Event::Key(key)) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if is_ctrl_c(&key) {
                    break Ok(());
                }
                match view.handle_key(key, api) {
                    ViewAction::Close => break Ok(()),
                    ViewAction::Continue => {}
                }
            }
            _ => {}
        }
    };

    drop(terminal);
    ratatui::restore();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toast_clears_after_three_keys() {
        let mut t = Toast::default();
        t.set("Saved");
        t.tick();
        t.tick();
        assert_eq!(t.message(), Some("Saved"));
        t.tick();
        assert_eq!(t.message(), None);
    }

    #[test]
    fn clip_marks_truncation() {
        assert_eq!(clip("Acme", 10), "Acme");
        assert_eq!(clip("Acme Corporation", 6), "Acme …");
        assert_eq!(clip("abc", 0), "");
    }

    #[test]
    fn each_status_has_a_distinct_color() {
        let colors: Vec<_> = InvoiceStatus::ALL.iter().map(|s| status_style(*s).fg).collect();
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
