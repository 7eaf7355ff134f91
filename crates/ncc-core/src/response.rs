//! Decoding of the backend's inconsistent response shapes.
//!
//! Collections arrive as a bare array or as `{ "data": [...] }`; mutations
//! return the object directly or wrapped the same way; errors carry their
//! message under one of several keys. Each shape gets one function with an
//! explicit, ordered fallback chain.

use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{Error, Result, record::UserProfile};

/// Generic message for a `409` raised by a delete with dependent records.
pub const CONFLICT_FALLBACK: &str =
  "Cannot delete: there are dependent records associated with it.";

/// Take the array out of a collection response: bare array first, then the
/// `data` envelope. Anything else is an error.
pub fn collection_items(body: Value) -> Result<Vec<Value>> {
  match body {
    Value::Array(items) => Ok(items),
    Value::Object(mut map) => match map.remove("data") {
      Some(Value::Array(items)) => Ok(items),
      _ => Err(Error::UnexpectedShape("an array or a `data` array")),
    },
    _ => Err(Error::UnexpectedShape("an array or a `data` array")),
  }
}

/// Decode a collection response into typed records.
pub fn decode_collection<T: DeserializeOwned>(body: Value) -> Result<Vec<T>> {
  collection_items(body)?
    .into_iter()
    .map(|item| serde_json::from_value(item).map_err(Error::from))
    .collect()
}

/// Unwrap a mutation response: the `data` envelope when it holds an object,
/// else the body itself.
pub fn item_value(body: Value) -> Value {
  match body {
    Value::Object(mut map) if map.get("data").is_some_and(Value::is_object) => {
      map.remove("data").unwrap_or_default()
    }
    other => other,
  }
}

/// Decode a mutation response into a typed record.
pub fn decode_item<T: DeserializeOwned>(body: Value) -> Result<T> {
  Ok(serde_json::from_value(item_value(body))?)
}

/// Best-effort human-readable message from an error body.
///
/// Tried in order: `mensaje`, the first `errores[].msg`, `error`.
pub fn error_message(body: &Value) -> Option<String> {
  let text = |v: Option<&Value>| {
    v.and_then(Value::as_str)
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(str::to_owned)
  };

  text(body.get("mensaje"))
    .or_else(|| text(body.pointer("/errores/0/msg")))
    .or_else(|| text(body.get("error")))
}

/// [`error_message`], or `fallback` when the body carries none.
pub fn error_message_or(body: &Value, fallback: &str) -> String {
  error_message(body).unwrap_or_else(|| fallback.to_owned())
}

// ─── Login ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawLogin {
  #[serde(default)]
  ok:      bool,
  token:   Option<String>,
  usuario: Option<UserProfile>,
}

/// A successful `POST /api/login`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginGrant {
  pub token:   String,
  pub profile: Option<UserProfile>,
}

/// Decode a login response. Only `{ "ok": true, "token": ... }` is a grant;
/// any other body yields its server message, or `None` if it has none.
pub fn decode_login(body: &Value) -> std::result::Result<LoginGrant, Option<String>> {
  let raw: Option<RawLogin> = serde_json::from_value(body.clone()).ok();
  match raw {
    Some(RawLogin {
      ok: true,
      token: Some(token),
      usuario,
    }) if !token.is_empty() => Ok(LoginGrant {
      token,
      profile: usuario,
    }),
    _ => Err(error_message(body)),
  }
}
