//! Async HTTP client wrapping the NCC JSON API.
//!
//! Every request carries the session's bearer token. A `401` from any
//! endpoint clears the session and surfaces as [`ClientError::Unauthorized`],
//! which callers treat as "signed out" rather than as a message to show.

use std::time::Duration;

use ncc_core::response::{
  CONFLICT_FALLBACK, LoginGrant, decode_collection, decode_login, error_message_or, item_value,
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use thiserror::Error;

use crate::session::{self, SessionError, SessionHandle};

/// Connection settings for the NCC API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub timeout:  Duration,
}

#[derive(Debug, Error)]
pub enum ClientError {
  #[error("session expired or unauthorized; sign in again")]
  Unauthorized,

  /// `409`, typically a delete blocked by dependent records.
  #[error("{0}")]
  Conflict(String),

  #[error("{message}")]
  Api { status: StatusCode, message: String },

  #[error("request failed: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("unexpected response: {0}")]
  Decode(#[from] ncc_core::Error),

  #[error(transparent)]
  Session(#[from] SessionError),
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

// ─── Resources ────────────────────────────────────────────────────────────────

/// A REST collection exposed under `/api`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
  Companies,
  MiningOperators,
  Unions,
  Negotiations,
  Monitoring,
  Users,
  Roles,
}

impl Resource {
  pub fn path(self) -> &'static str {
    match self {
      Self::Companies => "/empresas",
      Self::MiningOperators => "/mineras",
      Self::Unions => "/sindicatos",
      Self::Negotiations => "/negociaciones",
      Self::Monitoring => "/monitoreos",
      Self::Users => "/usuarios",
      Self::Roles => "/roles",
    }
  }

  /// Message for a `409` that carries no server message.
  fn conflict_fallback(self) -> &'static str {
    match self {
      Self::MiningOperators => {
        "Cannot delete: there are companies associated with this mining operator."
      }
      _ => CONFLICT_FALLBACK,
    }
  }
}

// ─── Client ───────────────────────────────────────────────────────────────────

/// Async HTTP client for the NCC JSON REST API.
///
/// Cheap to clone — the inner [`reqwest::Client`] and the session handle are
/// both `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client:  Client,
  config:  ApiConfig,
  session: SessionHandle,
}

impl ApiClient {
  pub fn new(config: ApiConfig, session: SessionHandle) -> Result<Self> {
    let client = Client::builder().timeout(config.timeout).build()?;
    Ok(Self {
      client,
      config,
      session,
    })
  }

  pub fn session(&self) -> &SessionHandle { &self.session }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/api{}",
      self.config.base_url.trim_end_matches('/'),
      path
    )
  }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    match session::lock(&self.session).token() {
      Some(token) => req.bearer_auth(token),
      None => req,
    }
  }

  /// Send `req` and read its JSON body, mapping failures onto
  /// [`ClientError`]. An empty or non-JSON body reads as `null`.
  async fn execute(
    &self,
    req: RequestBuilder,
    what: &str,
    conflict_fallback: &str,
    fallback: &str,
  ) -> Result<Value> {
    tracing::debug!("{what}");
    let resp = self.auth(req).send().await?;
    let status = resp.status();

    if status == StatusCode::UNAUTHORIZED {
      tracing::warn!("{what} → 401; clearing session");
      if let Err(e) = session::lock(&self.session).clear() {
        tracing::error!("failed to clear session: {e}");
      }
      return Err(ClientError::Unauthorized);
    }

    let text = resp.text().await?;
    let body = serde_json::from_str(&text).unwrap_or(Value::Null);
    if status.is_success() {
      return Ok(body);
    }

    let err = if status == StatusCode::CONFLICT {
      ClientError::Conflict(error_message_or(&body, conflict_fallback))
    } else {
      ClientError::Api {
        status,
        message: error_message_or(&body, fallback),
      }
    };
    tracing::warn!("{what} → {status}: {err}");
    Err(err)
  }

  // ── Collections ─────────────────────────────────────────────────────────

  /// `GET /api/<resource>` as raw JSON items (bare array or `data` envelope).
  pub async fn list_raw(&self, resource: Resource) -> Result<Vec<Value>> {
    let path = resource.path();
    let body = self
      .execute(
        self.client.get(self.url(path)),
        &format!("GET {path}"),
        CONFLICT_FALLBACK,
        "Could not load the list.",
      )
      .await?;
    Ok(ncc_core::response::collection_items(body)?)
  }

  /// `GET /api/<resource>` decoded into records.
  pub async fn list<T: DeserializeOwned>(&self, resource: Resource) -> Result<Vec<T>> {
    let items = self.list_raw(resource).await?;
    Ok(decode_collection(Value::Array(items))?)
  }

  // ── Mutations ───────────────────────────────────────────────────────────

  /// `POST /api/<resource>`; returns the created object, unwrapped.
  pub async fn create<B: Serialize>(&self, resource: Resource, body: &B) -> Result<Value> {
    let path = resource.path();
    let body = self
      .execute(
        self.client.post(self.url(path)).json(body),
        &format!("POST {path}"),
        resource.conflict_fallback(),
        "API error while saving.",
      )
      .await?;
    Ok(item_value(body))
  }

  /// `PUT /api/<resource>/<id>`; returns the updated object, unwrapped.
  pub async fn update<B: Serialize>(
    &self,
    resource: Resource,
    id: &str,
    body: &B,
  ) -> Result<Value> {
    let path = format!("{}/{id}", resource.path());
    let body = self
      .execute(
        self.client.put(self.url(&path)).json(body),
        &format!("PUT {path}"),
        resource.conflict_fallback(),
        "API error while saving.",
      )
      .await?;
    Ok(item_value(body))
  }

  /// `DELETE /api/<resource>/<id>`.
  pub async fn delete(&self, resource: Resource, id: &str) -> Result<()> {
    let path = format!("{}/{id}", resource.path());
    self
      .execute(
        self.client.delete(self.url(&path)),
        &format!("DELETE {path}"),
        resource.conflict_fallback(),
        "API error while deleting.",
      )
      .await?;
    Ok(())
  }

  // ── Authentication ──────────────────────────────────────────────────────

  /// `POST /api/login` with a handle or email; stores the grant in the
  /// session on success.
  pub async fn login(&self, identifier: &str, password: &str) -> Result<LoginGrant> {
    let resp = self
      .client
      .post(self.url("/login"))
      .json(&json!({ "identificador": identifier.trim(), "password": password }))
      .send()
      .await?;
    let status = resp.status();
    let text = resp.text().await?;

    let Ok(body) = serde_json::from_str::<Value>(&text) else {
      return Err(ClientError::Api {
        status,
        message: "The API did not return JSON; check the configured URL.".into(),
      });
    };

    let grant = match decode_login(&body) {
      Ok(grant) if status.is_success() => grant,
      Ok(_) | Err(_) => {
        let message = error_message_or(&body, "Invalid credentials.");
        tracing::warn!("login as {identifier} rejected: {status}");
        return Err(ClientError::Api { status, message });
      }
    };

    session::lock(&self.session).sign_in(grant.token.clone(), grant.profile.clone())?;
    tracing::info!("signed in as {identifier}");
    Ok(grant)
  }

  /// Forget the stored session.
  pub fn logout(&self) -> Result<()> {
    session::lock(&self.session).clear()?;
    tracing::info!("signed out");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  };

  use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode as AxumStatus},
    routing::{delete, get, post},
  };
  use ncc_core::record::MiningOperator;

  use super::*;
  use crate::session::{Session, tests::temp_session_path};

  /// Serve `router` on an ephemeral local port and return its base URL.
  async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}")
  }

  fn signed_in_client(base_url: String) -> ApiClient {
    let mut session = Session::load(temp_session_path()).unwrap();
    session.sign_in("tok".into(), None).unwrap();
    ApiClient::new(
      ApiConfig {
        base_url,
        timeout: Duration::from_secs(5),
      },
      session.into_handle(),
    )
    .unwrap()
  }

  #[tokio::test]
  async fn list_sends_bearer_and_accepts_both_shapes() {
    let router = Router::new()
      .route(
        "/api/mineras",
        get(|headers: HeaderMap| async move {
          let auth = headers.get("authorization").and_then(|v| v.to_str().ok());
          assert_eq!(auth, Some("Bearer tok"));
          Json(serde_json::json!({
            "ok": true,
            "data": [{ "id_minera": 1, "nombre_minera": "Norte" }],
          }))
        }),
      )
      .route(
        "/api/usuarios",
        get(|| async { Json(serde_json::json!([{ "id_usuario": 3, "usuario": "ana" }])) }),
      );
    let client = signed_in_client(serve(router).await);

    let mining: Vec<MiningOperator> = client.list(Resource::MiningOperators).await.unwrap();
    assert_eq!(mining[0].name, "Norte");

    let users: Vec<ncc_core::record::User> = client.list(Resource::Users).await.unwrap();
    assert_eq!(users[0].handle, "ana");
  }

  #[tokio::test]
  async fn unauthorized_clears_session() {
    let router = Router::new().route(
      "/api/sindicatos",
      get(|| async {
        (
          AxumStatus::UNAUTHORIZED,
          Json(serde_json::json!({ "mensaje": "expired" })),
        )
      }),
    );
    let client = signed_in_client(serve(router).await);
    let path = session::lock(client.session()).path().to_path_buf();

    let err = client.list_raw(Resource::Unions).await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized));
    assert!(!session::lock(client.session()).is_authenticated());

    let raw = std::fs::read_to_string(path).unwrap();
    assert!(!raw.contains(session::TOKEN_KEY));
    assert!(!raw.contains(session::PROFILE_KEY));
  }

  #[tokio::test]
  async fn conflict_uses_server_message_then_fallback() {
    let router = Router::new()
      .route(
        "/api/empresas/{id}",
        delete(|| async {
          (AxumStatus::CONFLICT, Json(serde_json::json!({ "mensaje": "has negotiations" })))
        }),
      )
      .route(
        "/api/mineras/{id}",
        delete(|| async { (AxumStatus::CONFLICT, "") }),
      );
    let client = signed_in_client(serve(router).await);

    let err = client.delete(Resource::Companies, "1").await.unwrap_err();
    assert!(matches!(&err, ClientError::Conflict(m) if m == "has negotiations"));

    let err = client.delete(Resource::MiningOperators, "1").await.unwrap_err();
    assert!(matches!(&err, ClientError::Conflict(m) if m.contains("companies associated")));
  }

  #[tokio::test]
  async fn api_error_message_is_extracted() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new().route(
      "/api/sindicatos",
      post(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async {
          (
            AxumStatus::BAD_REQUEST,
            Json(serde_json::json!({ "errores": [{ "msg": "nombre inválido" }] })),
          )
        }
      }),
    );
    let client = signed_in_client(serve(router).await);

    let err = client
      .create(Resource::Unions, &serde_json::json!({ "nombre_sindicato": "x" }))
      .await
      .unwrap_err();
    assert_eq!(err.to_string(), "nombre inválido");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn create_unwraps_envelope() {
    let router = Router::new().route(
      "/api/mineras",
      post(|Json(body): Json<Value>| async move {
        Json(serde_json::json!({
          "ok": true,
          "data": { "id_minera": 9, "nombre_minera": body["nombre_minera"] },
        }))
      }),
    );
    let client = signed_in_client(serve(router).await);
    let created = client
      .create(Resource::MiningOperators, &serde_json::json!({ "nombre_minera": "Sur" }))
      .await
      .unwrap();
    assert_eq!(created["id_minera"], 9);
    assert_eq!(created["nombre_minera"], "Sur");
  }

  #[tokio::test]
  async fn login_stores_grant_or_reports_message() {
    let router = Router::new().route(
      "/api/login",
      post(|Json(body): Json<Value>| async move {
        if body["password"] == "secret" {
          (
            AxumStatus::OK,
            Json(serde_json::json!({
              "ok": true, "token": "fresh", "usuario": { "usuario": "ana", "id_rol": 1 }
            })),
          )
        } else {
          (
            AxumStatus::UNAUTHORIZED,
            Json(serde_json::json!({ "ok": false, "mensaje": "Credenciales inválidas" })),
          )
        }
      }),
    );
    let base_url = serve(router).await;
    let session = Session::load(temp_session_path()).unwrap().into_handle();
    let client = ApiClient::new(
      ApiConfig {
        base_url,
        timeout: Duration::from_secs(5),
      },
      session.clone(),
    )
    .unwrap();

    let err = client.login("ana", "wrong").await.unwrap_err();
    assert_eq!(err.to_string(), "Credenciales inválidas");
    assert!(!session::lock(&session).is_authenticated());

    client.login(" ana ", "secret").await.unwrap();
    let guard = session::lock(&session);
    assert_eq!(guard.token(), Some("fresh"));
    assert!(guard.is_admin());
  }
}
