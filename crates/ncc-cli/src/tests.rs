//! End-to-end console scenarios against an in-process mock backend.

use std::{
  sync::{Arc, Mutex},
  time::Duration,
};

use axum::{
  Json, Router,
  http::{Method, StatusCode, Uri},
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ncc_core::record::UserProfile;
use serde_json::{Value, json};

use crate::{
  app::{App, Mode, Screen},
  client::{ApiClient, ApiConfig},
  pages::{self, Page},
  session::{self, PROFILE_KEY, Session, TOKEN_KEY, tests::temp_session_path},
};

// ─── Mock backend ────────────────────────────────────────────────────────────

/// A canned answer for one `METHOD /path`.
type Canned = (Method, &'static str, StatusCode, Value);

/// Every request the backend saw, as `"METHOD /path"`.
#[derive(Clone, Default)]
struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
  fn all(&self) -> Vec<String> { self.0.lock().unwrap().clone() }

  fn count(&self, method: &str) -> usize {
    self
      .all()
      .iter()
      .filter(|r| r.starts_with(&format!("{method} ")))
      .count()
  }
}

/// Serve `canned` answers; any other `GET` is an empty collection and any
/// other method a `404`.
async fn backend(canned: Vec<Canned>) -> (String, Log) {
  let log = Log::default();
  let canned = Arc::new(canned);
  let seen = log.clone();

  let router = Router::new().fallback(move |method: Method, uri: Uri| {
    let canned = canned.clone();
    let seen = seen.clone();
    async move {
      let path = uri.path().to_owned();
      seen.0.lock().unwrap().push(format!("{method} {path}"));
      match canned.iter().find(|(m, p, ..)| *m == method && *p == path) {
        Some((_, _, status, body)) => (*status, Json(body.clone())),
        None if method == Method::GET => (StatusCode::OK, Json(json!([]))),
        None => (StatusCode::NOT_FOUND, Json(json!({ "mensaje": "not found" }))),
      }
    }
  });

  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
  (format!("http://{addr}"), log)
}

fn admin() -> UserProfile {
  UserProfile {
    handle: Some("ana".into()),
    role_id: Some(1),
    ..Default::default()
  }
}

fn viewer() -> UserProfile {
  UserProfile {
    handle: Some("leo".into()),
    role_id: Some(2),
    ..Default::default()
  }
}

/// A signed-in console on `page`, with that page already loaded.
async fn console(canned: Vec<Canned>, profile: UserProfile, page: Page) -> (App, Log) {
  let (base_url, log) = backend(canned).await;
  let mut session = Session::load(temp_session_path()).unwrap();
  session.sign_in("tok".into(), Some(profile)).unwrap();
  let client = ApiClient::new(
    ApiConfig {
      base_url,
      timeout: Duration::from_secs(5),
    },
    session.into_handle(),
  )
  .unwrap();

  let mut app = App::new(client);
  app.page_index = app.pages.iter().position(|p| *p == page).unwrap();
  app.load().await;
  (app, log)
}

fn key(code: KeyCode) -> KeyEvent { KeyEvent::new(code, KeyModifiers::NONE) }

async fn press(app: &mut App, code: KeyCode) {
  assert!(app.handle_key(key(code)).await.unwrap());
}

async fn type_text(app: &mut App, text: &str) {
  for c in text.chars() {
    press(app, KeyCode::Char(c)).await;
  }
}

fn form_error(app: &App) -> Option<&'static str> {
  match &app.mode {
    Mode::Form(form) => form.error.as_ref().map(|e| e.field),
    _ => None,
  }
}

fn negotiations() -> Value {
  json!({ "ok": true, "data": [
    { "id_negociacion": 7,
      "Empresa": { "nombre_empresa": "Acme", "Minera": { "nombre_minera": "Norte" } },
      "estado": "En proceso", "contrato": "C-1", "fecha_inicio": "2024-01-01" },
    { "id_negociacion": 8, "empresa": "Beta", "minera": "Sur", "estado": "Cerrada" },
  ]})
}

// ─── Negotiation form ────────────────────────────────────────────────────────

/// Fill a new negotiation form with a start and a term date.
async fn negotiation_form(app: &mut App, start: &str, term: &str) {
  press(app, KeyCode::Char('n')).await;
  let Mode::Form(form) = &mut app.mode else {
    panic!("expected a form");
  };
  form.set("id_empresa", "1");
  form.set("id_sindicato", "2");
  form.set("contrato", "C-9");
  form.set("fecha_inicio", start);
  form.set("fecha_termino", term);
}

#[tokio::test]
async fn term_over_36_months_is_blocked_without_a_request() {
  let (mut app, log) = console(vec![], admin(), Page::Negotiations).await;
  let before = log.all().len();

  negotiation_form(&mut app, "2024-01-01", "2027-02-01").await;
  press(&mut app, KeyCode::Enter).await;

  assert_eq!(log.all().len(), before, "no request may be sent");
  assert_eq!(form_error(&app), Some("fecha_termino"));
  assert!(app.status_msg.contains("36 months"));
}

#[tokio::test]
async fn term_of_exactly_36_months_is_sent() {
  let canned = vec![(
    Method::POST,
    "/api/negociaciones",
    StatusCode::CREATED,
    json!({ "ok": true, "data": { "id_negociacion": 9 } }),
  )];
  let (mut app, log) = console(canned, admin(), Page::Negotiations).await;

  negotiation_form(&mut app, "2024-01-01", "2027-01-01").await;
  press(&mut app, KeyCode::Enter).await;

  assert_eq!(log.count("POST"), 1);
  assert_eq!(app.mode, Mode::Browse);
  assert_eq!(app.status_msg, "Saved.");
}

#[tokio::test]
async fn closing_a_negotiation_suggests_a_term() {
  let (mut app, _log) = console(vec![], admin(), Page::Negotiations).await;
  press(&mut app, KeyCode::Char('n')).await;

  // Focus the start date and type it.
  let Mode::Form(form) = &mut app.mode else {
    panic!("expected a form");
  };
  form.focus = form.fields.iter().position(|f| f.key == "fecha_inicio").unwrap();
  type_text(&mut app, "2024-03-10").await;

  // Move up to the status select and cycle to "cerrada".
  press(&mut app, KeyCode::Up).await;
  press(&mut app, KeyCode::Right).await;
  press(&mut app, KeyCode::Right).await;

  let Mode::Form(form) = &app.mode else {
    panic!("expected a form");
  };
  assert_eq!(form.value("estado"), "cerrada");
  assert_eq!(form.value("fecha_termino"), "2027-03-10");
}

// ─── Session ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unauthorized_response_signs_out_and_clears_session() {
  let canned = vec![(
    Method::GET,
    "/api/negociaciones",
    StatusCode::UNAUTHORIZED,
    json!({ "mensaje": "token expirado" }),
  )];
  let (app, _log) = console(canned, viewer(), Page::Listing).await;

  assert_eq!(app.screen, Screen::SignedOut);
  assert!(app.status_msg.is_empty());

  let session = session::lock(app.client.session());
  assert!(!session.is_authenticated());
  assert!(session.profile().is_none());
  let raw: Value =
    serde_json::from_str(&std::fs::read_to_string(session.path()).unwrap()).unwrap();
  assert!(raw.get(TOKEN_KEY).is_none());
  assert!(raw.get(PROFILE_KEY).is_none());
}

#[tokio::test]
async fn signed_out_console_does_not_load() {
  let (base_url, log) = backend(vec![]).await;
  let session = Session::load(temp_session_path()).unwrap();
  let client = ApiClient::new(
    ApiConfig {
      base_url,
      timeout: Duration::from_secs(5),
    },
    session.into_handle(),
  )
  .unwrap();

  let mut app = App::new(client);
  app.load().await;
  assert_eq!(app.screen, Screen::SignedOut);
  assert!(log.all().is_empty());
  assert!(!app.handle_key(key(KeyCode::Char('q'))).await.unwrap());
}

#[tokio::test]
async fn unauthorized_save_signs_out_and_drops_the_form() {
  let canned = vec![(
    Method::POST,
    "/api/mineras",
    StatusCode::UNAUTHORIZED,
    json!({ "mensaje": "token expirado" }),
  )];
  let (mut app, log) = console(canned, admin(), Page::MiningOperators).await;

  mining_form(&mut app, "Norte").await;
  press(&mut app, KeyCode::Enter).await;

  assert_eq!(log.count("POST"), 1);
  assert_eq!(app.screen, Screen::SignedOut);
  assert_eq!(app.mode, Mode::Browse);
  assert!(app.status_msg.is_empty());

  let session = session::lock(app.client.session());
  assert!(!session.is_authenticated());
  let raw: Value =
    serde_json::from_str(&std::fs::read_to_string(session.path()).unwrap()).unwrap();
  assert!(raw.get(TOKEN_KEY).is_none());
  assert!(raw.get(PROFILE_KEY).is_none());
}

// ─── Pages ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn viewer_sees_listing_from_envelope() {
  let canned = vec![(Method::GET, "/api/negociaciones", StatusCode::OK, negotiations())];
  let (app, log) = console(canned, viewer(), Page::Listing).await;

  assert_eq!(app.pages, [Page::Listing, Page::Reports]);
  assert_eq!(log.all(), ["GET /api/negociaciones"]);

  let table = app.table();
  assert_eq!(table.rows.len(), 2);
  assert_eq!(table.rows[0].cells[0], "Norte");
  assert_eq!(table.rows[0].cells[1], "Acme");
  assert_eq!(table.rows[0].cells[4], "en proceso");
}

#[tokio::test]
async fn free_text_filter_narrows_without_requests() {
  let canned = vec![(Method::GET, "/api/negociaciones", StatusCode::OK, negotiations())];
  let (mut app, log) = console(canned, viewer(), Page::Listing).await;
  let before = log.all().len();

  press(&mut app, KeyCode::Char('/')).await;
  type_text(&mut app, "BETA").await;
  press(&mut app, KeyCode::Enter).await;

  assert_eq!(app.mode, Mode::Browse);
  let table = app.table();
  assert_eq!(table.rows.len(), 1);
  assert_eq!(table.rows[0].id.as_deref(), Some("8"));
  assert_eq!(table.total, 2);
  assert_eq!(log.all().len(), before);
}

#[tokio::test]
async fn report_filter_form_applies_criteria() {
  let canned = vec![(Method::GET, "/api/negociaciones", StatusCode::OK, negotiations())];
  let (mut app, log) = console(canned, viewer(), Page::Reports).await;
  let before = log.all().len();

  press(&mut app, KeyCode::Char('f')).await;
  {
    let Mode::Form(form) = &mut app.mode else {
      panic!("expected a form");
    };
    form.set("estado", "cerrada");
  }
  press(&mut app, KeyCode::Enter).await;

  let table = app.table();
  assert_eq!(table.rows.len(), 1);
  assert_eq!(table.rows[0].cells[1], "Beta");
  assert_eq!(table.paging, Some((1, 1)));
  assert_eq!(log.all().len(), before);

  press(&mut app, KeyCode::Char('c')).await;
  assert_eq!(app.table().rows.len(), 2);
}

// ─── Companies ───────────────────────────────────────────────────────────────

fn companies() -> Value {
  json!([
    { "id_empresa": 1, "nombre_empresa": "Acme", "rut_empresa": "76.123.456-5", "id_minera": 10,
      "Minera": { "id_minera": 10, "nombre_minera": "Norte" } },
  ])
}

#[tokio::test]
async fn duplicate_company_is_refused_locally() {
  let canned = vec![(Method::GET, "/api/empresas", StatusCode::OK, companies())];
  let (mut app, log) = console(canned, admin(), Page::Companies).await;

  press(&mut app, KeyCode::Char('n')).await;
  {
    let Mode::Form(form) = &mut app.mode else {
      panic!("expected a form");
    };
    form.set("nombre_empresa", "Other");
    form.set("rut_empresa", "761234565");
    form.set("id_minera", "10");
  }
  press(&mut app, KeyCode::Enter).await;

  assert_eq!(form_error(&app), Some("rut_empresa"));
  assert_eq!(log.count("POST"), 0);
}

#[tokio::test]
async fn conflicting_delete_shows_server_message() {
  let canned = vec![
    (Method::GET, "/api/empresas", StatusCode::OK, companies()),
    (
      Method::DELETE,
      "/api/empresas/1",
      StatusCode::CONFLICT,
      json!({ "mensaje": "La empresa tiene negociaciones asociadas." }),
    ),
  ];
  let (mut app, log) = console(canned, admin(), Page::Companies).await;

  press(&mut app, KeyCode::Char('d')).await;
  assert!(matches!(&app.mode, Mode::ConfirmDelete { id, .. } if id == "1"));
  press(&mut app, KeyCode::Char('y')).await;

  assert_eq!(log.count("DELETE"), 1);
  assert_eq!(app.status_msg, "La empresa tiene negociaciones asociadas.");
  assert_eq!(app.screen, Screen::Console);
  assert_eq!(app.table().rows.len(), 1);
}

#[tokio::test]
async fn declined_delete_sends_nothing() {
  let canned = vec![(Method::GET, "/api/empresas", StatusCode::OK, companies())];
  let (mut app, log) = console(canned, admin(), Page::Companies).await;

  press(&mut app, KeyCode::Char('d')).await;
  press(&mut app, KeyCode::Char('n')).await;

  assert_eq!(app.mode, Mode::Browse);
  assert_eq!(log.count("DELETE"), 0);
}

#[tokio::test]
async fn edit_form_is_prefilled_from_loaded_row() {
  let canned = vec![(Method::GET, "/api/empresas", StatusCode::OK, companies())];
  let (mut app, _log) = console(canned, admin(), Page::Companies).await;

  press(&mut app, KeyCode::Char('e')).await;
  let Mode::Form(form) = &app.mode else {
    panic!("expected a form");
  };
  assert_eq!(form.value("nombre_empresa"), "Acme");
  assert_eq!(form.value("id_minera"), "10");
  assert_eq!(
    form.kind,
    crate::form::FormKind::Company { editing: Some(1) }
  );
  assert!(pages::company_draft(form).validate(&app.data.companies, Some(1)).is_ok());
}

// ─── Mining operators ────────────────────────────────────────────────────────

/// Open a new mining operator form named `name`.
async fn mining_form(app: &mut App, name: &str) {
  press(app, KeyCode::Char('n')).await;
  let Mode::Form(form) = &mut app.mode else {
    panic!("expected a form");
  };
  form.set("nombre_minera", name);
}

#[tokio::test]
async fn failed_reload_after_save_keeps_the_error() {
  let canned = vec![
    (
      Method::POST,
      "/api/mineras",
      StatusCode::CREATED,
      json!({ "ok": true, "data": { "id_minera": 3, "nombre_minera": "Norte" } }),
    ),
    (
      Method::GET,
      "/api/mineras",
      StatusCode::INTERNAL_SERVER_ERROR,
      json!({ "mensaje": "db down" }),
    ),
  ];
  let (mut app, log) = console(canned, admin(), Page::MiningOperators).await;
  app.status_msg.clear();

  mining_form(&mut app, "Norte").await;
  press(&mut app, KeyCode::Enter).await;

  assert_eq!(
    log.all(),
    ["GET /api/mineras", "POST /api/mineras", "GET /api/mineras"]
  );
  assert_eq!(app.mode, Mode::Browse);
  assert_eq!(app.status_msg, "db down");
  assert!(!app.loading);
}

#[tokio::test]
async fn pending_request_ignores_submit() {
  let canned = vec![(
    Method::POST,
    "/api/mineras",
    StatusCode::CREATED,
    json!({ "ok": true, "data": { "id_minera": 3, "nombre_minera": "Norte" } }),
  )];
  let (mut app, log) = console(canned, admin(), Page::MiningOperators).await;

  mining_form(&mut app, "Norte").await;
  app.loading = true;
  press(&mut app, KeyCode::Enter).await;
  assert_eq!(log.count("POST"), 0);
  assert!(matches!(app.mode, Mode::Form(_)));

  app.loading = false;
  press(&mut app, KeyCode::Enter).await;
  assert_eq!(log.count("POST"), 1);
  assert_eq!(app.status_msg, "Saved.");
  assert!(!app.loading);
}

#[tokio::test]
async fn pending_request_ignores_delete_confirmation() {
  let canned = vec![(Method::GET, "/api/empresas", StatusCode::OK, companies())];
  let (mut app, log) = console(canned, admin(), Page::Companies).await;

  press(&mut app, KeyCode::Char('d')).await;
  app.loading = true;
  press(&mut app, KeyCode::Char('y')).await;

  assert_eq!(log.count("DELETE"), 0);
  assert!(matches!(app.mode, Mode::ConfirmDelete { .. }));
}
