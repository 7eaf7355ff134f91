//! Modal form editor.

use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Clear, Paragraph},
};

use super::centered;
use crate::form::{FieldKind, Form};

const LABEL_WIDTH: usize = 22;

pub fn draw(f: &mut Frame, area: Rect, form: &Form) {
  // One line per field, a blank line, and the error line.
  let height = form.fields.len() as u16 + 4;
  let area = centered(area, 72, height);

  let block = Block::default()
    .title(format!(" {} ", form.title))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Cyan));
  let inner = block.inner(area);
  f.render_widget(Clear, area);
  f.render_widget(block, area);

  let mut lines: Vec<Line> = form
    .fields
    .iter()
    .enumerate()
    .map(|(i, field)| {
      let focused = i == form.focus;
      let invalid = form.error.as_ref().is_some_and(|e| e.field == field.key);

      let label_style = match (focused, invalid) {
        (_, true) => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        (true, false) => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        (false, false) => Style::default().fg(Color::Gray),
      };
      let mut value = field.display();
      match (&field.kind, focused) {
        (FieldKind::Select(_), _) => value = format!("‹ {value} ›"),
        (_, true) => value.push('_'),
        _ => {}
      }

      Line::from(vec![
        Span::styled(format!("{:<LABEL_WIDTH$}", field.label), label_style),
        Span::styled(
          value,
          if focused {
            Style::default().fg(Color::White)
          } else {
            Style::default()
          },
        ),
      ])
    })
    .collect();

  lines.push(Line::from(""));
  if let Some(error) = &form.error {
    lines.push(Line::from(Span::styled(
      error.message.clone(),
      Style::default().fg(Color::Red),
    )));
  }

  f.render_widget(Paragraph::new(lines), inner);
}
