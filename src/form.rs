//! Field-by-field text entry shared by the client, account, login and
//! register screens.

use crossterm::event::KeyCode;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use zeroize::Zeroize;

use crate::tui::ERROR_STYLE;
use crate::validate::FieldError;

const LABEL_WIDTH: usize = 18;

pub enum FieldKind {
    Text,
    /// Rendered as dots. Zeroized when the form is dropped.
    Secret,
    Selector { options: Vec<String>, selected: usize },
}

pub struct FormField {
    pub key: &'static str,
    pub label: &'static str,
    pub value: String,
    pub kind: FieldKind,
    cursor: usize,
}

impl FormField {
    pub fn text(key: &'static str, label: &'static str, value: &str) -> Self {
        Self {
            key,
            label,
            value: value.to_string(),
            kind: FieldKind::Text,
            cursor: value.chars().count(),
        }
    }

    pub fn secret(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            value: String::new(),
            kind: FieldKind::Secret,
            cursor: 0,
        }
    }

    pub fn selector(key: &'static str, label: &'static str, options: Vec<String>, selected: usize) -> Self {
        let selected = selected.min(options.len().saturating_sub(1));
        Self {
            key,
            label,
            value: options.get(selected).cloned().unwrap_or_default(),
            kind: FieldKind::Selector { options, selected },
            cursor: 0,
        }
    }

    fn byte_pos(&self) -> usize {
        self.value
            .char_indices()
            .nth(self.cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEvent {
    None,
    Changed,
    Submit,
    Cancel,
}

pub struct Form {
    pub fields: Vec<FormField>,
    pub focused: usize,
    errors: Vec<FieldError>,
}

impl Form {
    pub fn new(fields: Vec<FormField>) -> Self {
        Self {
            fields,
            focused: 0,
            errors: Vec::new(),
        }
    }

    pub fn value(&self, key: &str) -> &str {
        self.fields
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.value.as_str())
            .unwrap_or("")
    }

    /// Trimmed value, or `None` when blank.
    pub fn optional(&self, key: &str) -> Option<String> {
        let v = self.value(key).trim();
        (!v.is_empty()).then(|| v.to_string())
    }

    pub fn set_errors(&mut self, errors: Vec<FieldError>) {
        // Jump to the first field with a problem.
        if let Some(idx) = errors
            .first()
            .and_then(|e| self.fields.iter().position(|f| f.key == e.field))
        {
            self.focused = idx;
        }
        self.errors = errors;
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    pub fn error_for(&self, key: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == key)
            .map(|e| e.message.as_str())
    }

    pub fn handle_key(&mut self, code: KeyCode) -> FormEvent {
        if self.fields.is_empty() {
            return match code {
                KeyCode::Esc => FormEvent::Cancel,
                KeyCode::Enter => FormEvent::Submit,
                _ => FormEvent::None,
            };
        }
        let len = self.fields.len();
        match code {
            KeyCode::Esc => return FormEvent::Cancel,
            KeyCode::Enter => return FormEvent::Submit,
            KeyCode::Tab | KeyCode::Down => self.focused = (self.focused + 1) % len,
            KeyCode::BackTab | KeyCode::Up => {
                self.focused = if self.focused == 0 { len - 1 } else { self.focused - 1 };
            }
            _ => return self.edit_focused(code),
        }
        FormEvent::None
    }

    fn edit_focused(&mut self, code: KeyCode) -> FormEvent {
        let field = &mut self.fields[self.focused];
        if let FieldKind::Selector { options, selected } = &mut field.kind {
            if options.is_empty() {
                return FormEvent::None;
            }
            match code {
                KeyCode::Left => {
                    *selected = if *selected == 0 { options.len() - 1 } else { *selected - 1 };
                }
                KeyCode::Right | KeyCode::Char(' ') => {
                    *selected = (*selected + 1) % options.len();
                }
                _ => return FormEvent::None,
            }
            field.value = options[*selected].clone();
            return FormEvent::Changed;
        }

        let char_len = field.value.chars().count();
        match code {
            KeyCode::Char(c) => {
                let at = field.byte_pos();
                field.value.insert(at, c);
                field.cursor += 1;
            }
            KeyCode::Backspace => {
                if field.cursor == 0 {
                    return FormEvent::None;
                }
                field.cursor -= 1;
                let at = field.byte_pos();
                field.value.remove(at);
            }
            KeyCode::Delete => {
                if field.cursor >= char_len {
                    return FormEvent::None;
                }
                let at = field.byte_pos();
                field.value.remove(at);
            }
            KeyCode::Left => {
                field.cursor = field.cursor.saturating_sub(1);
                return FormEvent::None;
            }
            KeyCode::Right => {
                field.cursor = (field.cursor + 1).min(char_len);
                return FormEvent::None;
            }
            KeyCode::Home => {
                field.cursor = 0;
                return FormEvent::None;
            }
            KeyCode::End => {
                field.cursor = char_len;
                return FormEvent::None;
            }
            _ => return FormEvent::None,
        }
        let key = field.key;
        self.errors.retain(|e| e.field != key);
        FormEvent::Changed
    }

    pub fn lines(&self) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        for (i, field) in self.fields.iter().enumerate() {
            let is_focused = i == self.focused;
            let label_style = if is_focused {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let value_style = if is_focused {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            };
            let shown = match &field.kind {
                FieldKind::Selector { options, selected } => {
                    let arrows = if is_focused { ("< ", " >") } else { ("  ", "  ") };
                    let current = options.get(*selected).map(String::as_str).unwrap_or("");
                    format!("{}{current}{}", arrows.0, arrows.1)
                }
                FieldKind::Secret if is_focused => insert_cursor(&field.value, field.cursor, true),
                FieldKind::Secret => "\u{25cf}".repeat(field.value.chars().count()),
                FieldKind::Text if is_focused => insert_cursor(&field.value, field.cursor, false),
                FieldKind::Text => field.value.clone(),
            };
            lines.push(Line::from(vec![
                Span::styled(format!("   {:<LABEL_WIDTH$} ", field.label), label_style),
                Span::styled(shown, value_style),
            ]));
            if let Some(err) = self.error_for(field.key) {
                lines.push(Line::from(Span::styled(
                    format!("   {:<LABEL_WIDTH$} {err}", ""),
                    ERROR_STYLE,
                )));
            }
        }
        lines
    }

    pub fn wipe_secrets(&mut self) {
        for field in &mut self.fields {
            if let FieldKind::Secret = field.kind {
                field.value.zeroize();
                field.cursor = 0;
            }
        }
    }
}

impl Drop for Form {
    fn drop(&mut self) {
        self.wipe_secrets();
    }
}

/// Display string with a block cursor inserted at `cursor_pos`.
pub fn insert_cursor(value: &str, cursor_pos: usize, masked: bool) -> String {
    let mut display = if masked {
        "\u{25cf}".repeat(value.chars().count())
    } else {
        value.to_string()
    };
    let byte_pos = display
        .char_indices()
        .nth(cursor_pos)
        .map(|(i, _)| i)
        .unwrap_or(display.len());
    display.insert(byte_pos, '\u{2588}');
    display
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Form {
        Form::new(vec![
            FormField::text("name", "Name", "Acme"),
            FormField::secret("password", "Password"),
            FormField::selector("status", "Status", vec!["draft".into(), "sent".into()], 0),
        ])
    }

    #[test]
    fn typing_edits_at_cursor() {
        let mut f = sample();
        f.handle_key(KeyCode::Left);
        f.handle_key(KeyCode::Char('X'));
        assert_eq!(f.value("name"), "AcmXe");
        f.handle_key(KeyCode::Home);
        f.handle_key(KeyCode::Delete);
        assert_eq!(f.value("name"), "cmXe");
    }

    #[test]
    fn focus_wraps_both_ways() {
        let mut f = sample();
        f.handle_key(KeyCode::BackTab);
        assert_eq!(f.focused, 2);
        f.handle_key(KeyCode::Tab);
        assert_eq!(f.focused, 0);
    }

    #[test]
    fn selector_cycles_and_updates_value() {
        let mut f = sample();
        f.focused = 2;
        assert_eq!(f.handle_key(KeyCode::Right), FormEvent::Changed);
        assert_eq!(f.value("status"), "sent");
        f.handle_key(KeyCode::Right);
        assert_eq!(f.value("status"), "draft");
        assert_eq!(f.handle_key(KeyCode::Char('x')), FormEvent::None);
    }

    #[test]
    fn secrets_are_masked_and_wiped() {
        let mut f = sample();
        f.focused = 1;
        for c in "hunter2".chars() {
            f.handle_key(KeyCode::Char(c));
        }
        let rendered: String = f.lines()[1].spans.iter().map(|s| s.content.to_string()).collect();
        assert!(!rendered.contains("hunter2"));
        f.wipe_secrets();
        assert_eq!(f.value("password"), "");
    }

    #[test]
    fn errors_focus_field_and_clear_on_edit() {
        let mut f = sample();
        f.set_errors(vec![FieldError::new("password", "Password is required")]);
        assert_eq!(f.focused, 1);
        assert_eq!(f.error_for("password"), Some("Password is required"));
        assert_eq!(f.lines().len(), 4);
        f.handle_key(KeyCode::Char('a'));
        assert_eq!(f.error_for("password"), None);
    }

    #[test]
    fn optional_treats_blank_as_none() {
        let f = Form::new(vec![FormField::text("email", "Email", "   ")]);
        assert_eq!(f.optional("email"), None);
        assert_eq!(f.optional("missing"), None);
    }

    #[test]
    fn enter_and_esc_are_reported() {
        let mut f = sample();
        assert_eq!(f.handle_key(KeyCode::Enter), FormEvent::Submit);
        assert_eq!(f.handle_key(KeyCode::Esc), FormEvent::Cancel);
    }
}
