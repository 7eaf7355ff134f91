//! Application state machine and event dispatcher.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ncc_core::{
  ValidationError,
  normalize::{monitoring_rows, normalize_negotiations},
  record::{Company, MiningOperator, Monitoring, Role, Union, User},
  report::ReportFilter,
};
use serde::Serialize;

use crate::{
  client::{self, ApiClient, ClientError, Resource},
  form::{FieldKind, Form, FormKind},
  pages::{self, Data, Page, Table, TableRow},
  session,
};

// ─── Screen & mode ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
  /// No usable session; the user has to sign in from the command line.
  SignedOut,
  Console,
}

/// What keystrokes currently drive.
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
  Browse,
  /// Typing a free-text filter.
  Filter,
  Form(Form),
  ConfirmDelete { id: String, label: String },
}

/// How a submitted form ended.
enum Submission {
  /// Refused locally; nothing was sent.
  Rejected(ValidationError),
  Sent(client::Result<()>),
  /// Applied without a request (report criteria).
  Applied,
}

// ─── App ──────────────────────────────────────────────────────────────────────

/// Top-level application state.
pub struct App {
  pub screen:      Screen,
  pub mode:        Mode,

  /// Pages the signed-in role may open, in tab order.
  pub pages:       Vec<Page>,
  pub page_index:  usize,

  /// The last fetched collections.
  pub data:        Data,

  /// Free-text filter applied to the current page.
  pub filter:      String,

  /// Cursor position within the *filtered* rows.
  pub list_cursor: usize,

  pub report:      ReportFilter,
  /// 1-based report page; clamped when the table is built.
  pub report_page: usize,

  /// One-line status message shown in the status bar.
  pub status_msg:  String,
  /// Set while a request is pending; submissions are ignored meanwhile.
  pub loading:     bool,

  /// Who is signed in, for the header.
  pub user_label:  String,

  pub client:      ApiClient,
}

impl App {
  pub fn new(client: ApiClient) -> Self {
    let (screen, admin, user_label) = {
      let session = session::lock(client.session());
      let screen = if session.is_authenticated() {
        Screen::Console
      } else {
        Screen::SignedOut
      };
      let label = session.profile().map(|p| p.display_name()).unwrap_or_default();
      (screen, session.is_admin(), label)
    };

    Self {
      screen,
      mode: Mode::Browse,
      pages: Page::visible(admin),
      page_index: 0,
      data: Data::default(),
      filter: String::new(),
      list_cursor: 0,
      report: ReportFilter::default(),
      report_page: 1,
      status_msg: String::new(),
      loading: false,
      user_label,
      client,
    }
  }

  pub fn page(&self) -> Page { self.pages.get(self.page_index).copied().unwrap_or(Page::Listing) }

  /// The current page's rows after filtering.
  pub fn table(&self) -> Table {
    pages::table(
      self.page(),
      &self.data,
      &self.filter,
      &self.report,
      self.report_page,
    )
  }

  pub fn cursor_row(&self) -> Option<TableRow> {
    self.table().rows.into_iter().nth(self.list_cursor)
  }

  // ── Session ───────────────────────────────────────────────────────────────

  /// Route an API outcome: `401` signs out silently, other errors go to the
  /// status bar.
  fn settle<T>(&mut self, result: client::Result<T>) -> Option<T> {
    match result {
      Ok(value) => Some(value),
      Err(ClientError::Unauthorized) => {
        self.sign_out();
        None
      }
      Err(e) => {
        self.status_msg = e.to_string();
        None
      }
    }
  }

  fn sign_out(&mut self) {
    self.screen = Screen::SignedOut;
    self.mode = Mode::Browse;
    self.data = Data::default();
    self.status_msg.clear();
  }

  /// Fall back to the signed-out screen if the session was cleared behind
  /// our back.
  fn sync_session(&mut self) {
    if !session::lock(self.client.session()).is_authenticated() {
      self.sign_out();
    }
  }

  // ── Data loading ──────────────────────────────────────────────────────────

  /// Fetch everything the current page shows or offers in its forms.
  /// Returns `true` when the page data was refreshed.
  pub async fn load(&mut self) -> bool {
    if self.screen == Screen::SignedOut {
      return false;
    }
    self.loading = true;
    let client = self.client.clone();
    let data = &mut self.data;

    let result = match self.pages.get(self.page_index).copied().unwrap_or(Page::Listing) {
      Page::Negotiations => tokio::try_join!(
        client.list_raw(Resource::Negotiations),
        client.list::<Company>(Resource::Companies),
        client.list::<Union>(Resource::Unions),
      )
      .map(|(negotiations, companies, unions)| {
        data.negotiations = normalize_negotiations(&negotiations);
        data.companies = companies;
        data.unions = unions;
      }),
      Page::Listing | Page::Reports => client
        .list_raw(Resource::Negotiations)
        .await
        .map(|negotiations| data.negotiations = normalize_negotiations(&negotiations)),
      Page::Monitoring => tokio::try_join!(
        client.list::<Monitoring>(Resource::Monitoring),
        client.list_raw(Resource::Negotiations),
      )
      .map(|(entries, negotiations)| {
        data.negotiations = normalize_negotiations(&negotiations);
        data.monitoring = monitoring_rows(&entries, &data.negotiations);
      }),
      Page::Companies => tokio::try_join!(
        client.list::<Company>(Resource::Companies),
        client.list::<MiningOperator>(Resource::MiningOperators),
      )
      .map(|(companies, mining)| {
        data.companies = companies;
        data.mining = mining;
      }),
      Page::MiningOperators => client
        .list::<MiningOperator>(Resource::MiningOperators)
        .await
        .map(|mining| data.mining = mining),
      Page::Unions => client
        .list::<Union>(Resource::Unions)
        .await
        .map(|unions| data.unions = unions),
      Page::Users => tokio::try_join!(
        client.list::<User>(Resource::Users),
        client.list::<Role>(Resource::Roles),
      )
      .map(|(users, roles)| {
        data.users = users;
        data.roles = roles;
      }),
    };

    self.loading = false;
    let loaded = self.settle(result).is_some();
    if loaded {
      self.status_msg.clear();
    }
    self.clamp_cursor();
    loaded
  }

  fn clamp_cursor(&mut self) {
    let len = self.table().rows.len();
    self.list_cursor = self.list_cursor.min(len.saturating_sub(1));
  }

  async fn switch_page(&mut self, index: usize) {
    if index >= self.pages.len() || index == self.page_index {
      return;
    }
    self.page_index = index;
    self.filter.clear();
    self.list_cursor = 0;
    self.load().await;
  }

  // ── Key handling ──────────────────────────────────────────────────────────

  /// Process a key event. Returns `true` to continue, `false` to quit.
  pub async fn handle_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      return Ok(false);
    }

    if self.screen == Screen::SignedOut {
      return Ok(!matches!(key.code, KeyCode::Char('q') | KeyCode::Esc));
    }

    let cont = match self.mode {
      Mode::Browse => self.handle_browse_key(key).await,
      Mode::Filter => {
        self.handle_filter_key(key);
        true
      }
      Mode::Form(_) => {
        self.handle_form_key(key).await;
        true
      }
      Mode::ConfirmDelete { .. } => {
        self.handle_confirm_key(key).await;
        true
      }
    };
    self.sync_session();
    Ok(cont)
  }

  fn handle_filter_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.mode = Mode::Browse;
        self.filter.clear();
      }
      KeyCode::Enter => self.mode = Mode::Browse,
      KeyCode::Backspace => {
        self.filter.pop();
      }
      KeyCode::Char(c) => self.filter.push(c),
      _ => {}
    }
    self.list_cursor = 0;
  }

  async fn handle_browse_key(&mut self, key: KeyEvent) -> bool {
    let page = self.page();
    match key.code {
      KeyCode::Char('q') => return false,

      // Pages
      KeyCode::Tab => {
        let next = (self.page_index + 1) % self.pages.len().max(1);
        self.switch_page(next).await;
      }
      KeyCode::BackTab => {
        let len = self.pages.len().max(1);
        self.switch_page((self.page_index + len - 1) % len).await;
      }
      KeyCode::Char(c @ '1'..='9') => {
        let index = c as usize - '1' as usize;
        self.switch_page(index).await;
      }

      // Navigation
      KeyCode::Down | KeyCode::Char('j') => {
        if self.list_cursor + 1 < self.table().rows.len() {
          self.list_cursor += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.list_cursor = self.list_cursor.saturating_sub(1);
      }

      // Filter
      KeyCode::Char('/') if page != Page::Reports => {
        self.mode = Mode::Filter;
        self.filter.clear();
        self.list_cursor = 0;
      }
      KeyCode::Esc => {
        self.filter.clear();
        self.list_cursor = 0;
      }
      KeyCode::Char('r') => {
        self.load().await;
      }

      // Records
      KeyCode::Char('n') if page.editable() => {
        if let Some(form) = pages::new_form(page, &self.data) {
          self.mode = Mode::Form(form);
        }
      }
      KeyCode::Char('e') | KeyCode::Enter if page.editable() => self.open_edit(page),
      KeyCode::Char('d') if page.editable() => match self.cursor_row() {
        Some(TableRow {
          id: Some(id),
          label,
          ..
        }) => self.mode = Mode::ConfirmDelete { id, label },
        Some(_) => self.status_msg = "This row has no id and cannot be deleted.".into(),
        None => {}
      },

      // Reports
      KeyCode::Char('f') if page == Page::Reports => {
        self.mode = Mode::Form(pages::report_form(&self.data, &self.report));
      }
      KeyCode::Char('c') if page == Page::Reports => {
        self.report = ReportFilter::default();
        self.report_page = 1;
        self.list_cursor = 0;
      }
      KeyCode::Char(']') if page == Page::Reports => {
        if let Some((current, pages)) = self.table().paging
          && current < pages
        {
          self.report_page = current + 1;
          self.list_cursor = 0;
        }
      }
      KeyCode::Char('[') if page == Page::Reports => {
        if let Some((current, _)) = self.table().paging {
          self.report_page = current.saturating_sub(1).max(1);
          self.list_cursor = 0;
        }
      }

      _ => {}
    }
    true
  }

  fn open_edit(&mut self, page: Page) {
    match self.cursor_row() {
      Some(TableRow { id: Some(id), .. }) => match pages::edit_form(page, &self.data, &id) {
        Some(form) => self.mode = Mode::Form(form),
        None => self.status_msg = "Record not found; press r to reload.".into(),
      },
      Some(_) => self.status_msg = "This row has no id and cannot be edited.".into(),
      None => {}
    }
  }

  async fn handle_confirm_key(&mut self, key: KeyEvent) {
    if self.loading {
      return;
    }
    let Mode::ConfirmDelete { id, .. } = std::mem::replace(&mut self.mode, Mode::Browse) else {
      return;
    };
    if !matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
      return;
    }
    self.loading = true;
    let result = self.client.delete(self.page().resource(), &id).await;
    self.loading = false;
    if self.settle(result).is_some() && self.load().await {
      self.status_msg = "Deleted.".into();
    }
  }

  async fn handle_form_key(&mut self, key: KeyEvent) {
    let Mode::Form(form) = &mut self.mode else {
      return;
    };
    let focused = form.focused().map(|f| f.key);
    let negotiation = matches!(form.kind, FormKind::Negotiation { .. });
    let is_select = form
      .focused()
      .is_some_and(|f| matches!(f.kind, FieldKind::Select(_)));

    match key.code {
      KeyCode::Esc => {
        self.mode = Mode::Browse;
        self.status_msg.clear();
        return;
      }
      KeyCode::Enter if self.loading => return,
      KeyCode::Enter => {
        let Mode::Form(form) = std::mem::replace(&mut self.mode, Mode::Browse) else {
          return;
        };
        self.submit(form).await;
        return;
      }
      KeyCode::Tab | KeyCode::Down => form.next(),
      KeyCode::BackTab | KeyCode::Up => form.prev(),
      KeyCode::Right if is_select => form.cycle(true),
      KeyCode::Left if is_select => form.cycle(false),
      KeyCode::Char(' ') if is_select => form.cycle(true),
      KeyCode::Char(c) => form.input(c),
      KeyCode::Backspace => form.backspace(),
      _ => return,
    }

    // The term date is only suggested when the start date or the status
    // changes, never while moving between fields.
    let edited = !matches!(
      key.code,
      KeyCode::Tab | KeyCode::Down | KeyCode::BackTab | KeyCode::Up
    );
    if negotiation && edited && matches!(focused, Some("fecha_inicio" | "estado")) {
      pages::suggest_term(form);
    }
  }

  // ── Submission ────────────────────────────────────────────────────────────

  async fn save<B: Serialize>(
    &mut self,
    resource: Resource,
    editing: Option<String>,
    body: &B,
  ) -> client::Result<()> {
    self.loading = true;
    let result = match editing {
      Some(id) => self.client.update(resource, &id, body).await.map(drop),
      None => self.client.create(resource, body).await.map(drop),
    };
    self.loading = false;
    result
  }

  async fn submit(&mut self, mut form: Form) {
    let submission = match &form.kind {
      FormKind::Negotiation { editing } => match pages::negotiation_draft(&form).validate() {
        Err(e) => Submission::Rejected(e),
        Ok(body) => Submission::Sent(
          self
            .save(Resource::Negotiations, editing.clone(), &body)
            .await,
        ),
      },
      FormKind::Company { editing } => {
        match pages::company_draft(&form).validate(&self.data.companies, *editing) {
          Err(e) => Submission::Rejected(e),
          Ok(body) => Submission::Sent(
            self
              .save(Resource::Companies, editing.map(|id| id.to_string()), &body)
              .await,
          ),
        }
      }
      FormKind::Mining { editing } => match pages::mining_draft(&form).validate() {
        Err(e) => Submission::Rejected(e),
        Ok(body) => Submission::Sent(
          self
            .save(
              Resource::MiningOperators,
              editing.map(|id| id.to_string()),
              &body,
            )
            .await,
        ),
      },
      FormKind::Union { editing } => match pages::union_draft(&form).validate() {
        Err(e) => Submission::Rejected(e),
        Ok(body) => Submission::Sent(
          self
            .save(Resource::Unions, editing.map(|id| id.to_string()), &body)
            .await,
        ),
      },
      FormKind::User { editing } => match pages::user_draft(&form).validate(editing.is_none()) {
        Err(e) => Submission::Rejected(e),
        Ok(body) => Submission::Sent(
          self
            .save(Resource::Users, editing.map(|id| id.to_string()), &body)
            .await,
        ),
      },
      FormKind::Monitoring { editing } => {
        match pages::monitoring_draft(&form).validate(&self.data.negotiations) {
          Err(e) => Submission::Rejected(e),
          Ok(body) => Submission::Sent(
            self
              .save(Resource::Monitoring, editing.map(|id| id.to_string()), &body)
              .await,
          ),
        }
      }
      FormKind::ReportFilter => match pages::report_filter(&form) {
        Err(e) => Submission::Rejected(e),
        Ok(filter) => {
          self.report = filter;
          self.report_page = 1;
          self.list_cursor = 0;
          Submission::Applied
        }
      },
    };

    match submission {
      Submission::Rejected(e) => {
        tracing::debug!("form rejected on {}: {}", e.field, e.message);
        self.status_msg = e.message.clone();
        form.reject(e);
        self.mode = Mode::Form(form);
      }
      Submission::Sent(result) => {
        let saved = self.settle(result).is_some();
        if saved && self.load().await {
          self.status_msg = "Saved.".into();
        } else if !saved && self.screen == Screen::Console {
          // Keep the form open so the input can be corrected.
          self.mode = Mode::Form(form);
        }
      }
      Submission::Applied => self.status_msg.clear(),
    }
  }
}
