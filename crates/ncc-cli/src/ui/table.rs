//! Record table for the current page.

use ratatui::{
  Frame,
  layout::{Constraint, Rect},
  style::{Color, Modifier, Style},
  text::Line,
  widgets::{Block, Borders, Paragraph, Row, Table, TableState},
};

use crate::app::{App, Mode};

/// Render the current page's rows into `area`.
pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let table = app.table();
  let shown = table.rows.len();

  // Title with count.
  let mut title = if app.filter.is_empty() {
    format!(" {} ({}) ", app.page().title(), table.total)
  } else {
    format!(" {} ({}/{}) ", app.page().title(), shown, table.total)
  };
  if let Some((page, pages)) = table.paging {
    title = format!(" {} · page {page}/{pages} ", title.trim());
  }

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let mut inner = block.inner(area);
  f.render_widget(block, area);

  // Filter bar at the bottom of the pane while filtering or filtered.
  let filtering = app.mode == Mode::Filter;
  if (filtering || !app.filter.is_empty()) && inner.height > 2 {
    let filter_area = Rect {
      y: inner.y + inner.height - 1,
      height: 1,
      ..inner
    };
    inner.height -= 1;
    let text = if filtering {
      format!("/{}_", app.filter)
    } else {
      format!("/{}", app.filter)
    };
    f.render_widget(
      Paragraph::new(text).style(Style::default().fg(Color::Yellow)),
      filter_area,
    );
  }

  if table.rows.is_empty() {
    let hint = if table.total == 0 {
      "Nothing loaded. Press r to reload."
    } else {
      "No rows match."
    };
    f.render_widget(
      Paragraph::new(Line::from(hint)).style(Style::default().fg(Color::DarkGray)),
      inner,
    );
    return;
  }

  // Column widths: the widest cell per column, capped.
  let widths: Vec<Constraint> = (0..table.headers.len())
    .map(|col| {
      let widest = table
        .rows
        .iter()
        .filter_map(|r| r.cells.get(col))
        .map(|c| c.chars().count())
        .chain(std::iter::once(table.headers[col].chars().count()))
        .max()
        .unwrap_or(1);
      Constraint::Length(widest.min(32) as u16)
    })
    .collect();

  let header = Row::new(table.headers.clone()).style(
    Style::default()
      .fg(Color::Cyan)
      .add_modifier(Modifier::BOLD),
  );
  let rows = table.rows.into_iter().map(|r| Row::new(r.cells));

  let mut state = TableState::default();
  state.select(Some(app.list_cursor.min(shown - 1)));

  f.render_stateful_widget(
    Table::new(rows, widths)
      .header(header)
      .column_spacing(2)
      .row_highlight_style(
        Style::default()
          .bg(Color::Blue)
          .fg(Color::White)
          .add_modifier(Modifier::BOLD),
      ),
    inner,
    &mut state,
  );
}
