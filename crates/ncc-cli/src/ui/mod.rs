//! TUI rendering — orchestrates all panes.

pub mod form;
pub mod table;

use chrono::Local;
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Clear, Paragraph},
};

use crate::app::{App, Mode, Screen};

// ─── Root draw ────────────────────────────────────────────────────────────────

/// Main draw function called each frame.
pub fn draw(f: &mut Frame, app: &App) {
  let area = f.area();

  // Vertical stack: header, body, status bar.
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // header
      Constraint::Min(0),    // body
      Constraint::Length(1), // status bar
    ])
    .split(area);

  draw_header(f, rows[0], app);
  match app.screen {
    Screen::SignedOut => draw_signed_out(f, rows[1]),
    Screen::Console => {
      table::draw(f, rows[1], app);
      match &app.mode {
        Mode::Form(form) => form::draw(f, rows[1], form),
        Mode::ConfirmDelete { label, .. } => draw_confirm(f, rows[1], label),
        Mode::Browse | Mode::Filter => {}
      }
    }
  }
  draw_status(f, rows[2], app);
}

/// A rectangle of at most `width` × `height` centred in `area`.
pub(crate) fn centered(area: Rect, width: u16, height: u16) -> Rect {
  let width = width.min(area.width);
  let height = height.min(area.height);
  Rect {
    x: area.x + (area.width - width) / 2,
    y: area.y + (area.height - height) / 2,
    width,
    height,
  }
}

// ─── Header ───────────────────────────────────────────────────────────────────

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
  let date = Local::now().format("%Y-%m-%d").to_string();
  let bold = Style::default()
    .fg(Color::White)
    .add_modifier(Modifier::BOLD);

  let mut spans = vec![Span::styled(" ncc ", bold)];
  if app.screen == Screen::Console {
    for (i, page) in app.pages.iter().enumerate() {
      let label = format!(" {}:{} ", i + 1, page.title());
      let style = if i == app.page_index {
        Style::default()
          .fg(Color::Black)
          .bg(Color::Cyan)
          .add_modifier(Modifier::BOLD)
      } else {
        Style::default().fg(Color::Gray)
      };
      spans.push(Span::styled(label, style));
    }
  }

  let right = Span::styled(
    format!("{}  {date} ", app.user_label),
    Style::default().fg(Color::Gray),
  );

  // Simple left-right header: pad the middle.
  let left_width: usize = spans.iter().map(|s| s.content.chars().count()).sum();
  let right_width = right.content.chars().count();
  let pad = (area.width as usize)
    .saturating_sub(left_width)
    .saturating_sub(right_width);
  spans.push(Span::raw(" ".repeat(pad)));
  spans.push(right);

  let block = Block::default().style(Style::default().bg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(Paragraph::new(Line::from(spans)), inner);
}

// ─── Body overlays ────────────────────────────────────────────────────────────

fn draw_signed_out(f: &mut Frame, area: Rect) {
  let block = Block::default()
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(
    Paragraph::new(vec![
      Line::from(Span::styled(
        "Signed out.",
        Style::default().add_modifier(Modifier::BOLD),
      )),
      Line::from(""),
      Line::from(Span::styled(
        "Session ended. Run `ncc login --user <name>` to sign in again.",
        Style::default().fg(Color::DarkGray),
      )),
    ]),
    centered(inner, 64, 3),
  );
}

fn draw_confirm(f: &mut Frame, area: Rect, label: &str) {
  let area = centered(area, 56, 5);
  let block = Block::default()
    .title(" Delete ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Red));
  let inner = block.inner(area);
  f.render_widget(Clear, area);
  f.render_widget(block, area);
  f.render_widget(
    Paragraph::new(vec![
      Line::from(format!("Delete {label}?")),
      Line::from(""),
      Line::from(Span::styled(
        "y confirm  any other key cancel",
        Style::default().fg(Color::DarkGray),
      )),
    ]),
    inner,
  );
}

// ─── Status bar ───────────────────────────────────────────────────────────────

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
  let (mode_label, hints) = match (&app.screen, &app.mode) {
    (Screen::SignedOut, _) => ("SIGNED OUT", "q quit"),
    (_, Mode::Filter) => ("SEARCH", "Type to filter  Esc clear  Enter done"),
    (_, Mode::Form(_)) => (
      "FORM",
      "Tab/↑↓ field  ←→/space choose  Enter save  Esc cancel",
    ),
    (_, Mode::ConfirmDelete { .. }) => ("CONFIRM", "y delete  any key cancel"),
    (_, Mode::Browse) if app.page().editable() => (
      "NORMAL",
      "Tab page  ↑↓/jk move  / search  n new  e edit  d delete  r reload  q quit",
    ),
    (_, Mode::Browse) if app.page() == crate::pages::Page::Reports => (
      "NORMAL",
      "Tab page  f filters  c clear  [ ] page  r reload  q quit",
    ),
    (_, Mode::Browse) => ("NORMAL", "Tab page  ↑↓/jk move  / search  r reload  q quit"),
  };

  let status = if app.loading {
    "Working…".to_string()
  } else if app.status_msg.is_empty() {
    hints.to_string()
  } else {
    app.status_msg.clone()
  };

  let mode_span = Span::styled(
    format!(" {mode_label} "),
    Style::default()
      .fg(Color::Black)
      .bg(Color::Cyan)
      .add_modifier(Modifier::BOLD),
  );
  let hint_span = Span::styled(
    format!("  {status}"),
    Style::default().fg(Color::DarkGray),
  );

  let line = Line::from(vec![mode_span, hint_span]);
  f.render_widget(
    Paragraph::new(line).style(Style::default().bg(Color::Black)),
    area,
  );
}
