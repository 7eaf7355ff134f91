//! Passive records exchanged with the backend.
//!
//! The backend owns every record; the console only keeps the last fetched
//! collection per page. Wire names are the backend's Spanish snake_case keys.

use serde::{Deserialize, Deserializer, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Role id the backend assigns to administrators.
pub const ADMIN_ROLE_ID: i64 = 1;

/// Accepts `null` (or a missing key, with `#[serde(default)]`) as `""`.
fn null_as_empty<'de, D>(de: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(Option::<String>::deserialize(de)?.unwrap_or_default())
}

// ─── Enumerations ────────────────────────────────────────────────────────────

/// Negotiation status. Compared in lower case; sent capitalized.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumIter, EnumString, AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum NegotiationStatus {
  #[default]
  #[strum(serialize = "en proceso")]
  InProgress,
  #[strum(serialize = "en pausa")]
  Paused,
  #[strum(serialize = "cerrada")]
  Closed,
}

impl NegotiationStatus {
  /// The value the backend stores, e.g. `"En proceso"`.
  pub fn wire_value(self) -> String {
    let lower = self.as_ref();
    let mut chars = lower.chars();
    match chars.next() {
      Some(first) => first.to_uppercase().chain(chars).collect(),
      None => String::new(),
    }
  }
}

/// Union type, drawn from a fixed set.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  EnumString,
  AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum UnionKind {
  /// National union.
  #[strum(serialize = "Nacional")]
  #[serde(rename = "Nacional")]
  National,
  /// Site (faena) union.
  #[strum(serialize = "Faena")]
  #[serde(rename = "Faena")]
  Site,
  #[strum(serialize = "Interempresa")]
  #[serde(rename = "Interempresa")]
  InterCompany,
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MiningOperator {
  #[serde(rename = "id_minera", default)]
  pub id:   Option<i64>,
  #[serde(rename = "nombre_minera", default, deserialize_with = "null_as_empty")]
  pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Company {
  #[serde(rename = "id_empresa", default)]
  pub id:        Option<i64>,
  #[serde(rename = "nombre_empresa", default, deserialize_with = "null_as_empty")]
  pub name:      String,
  /// Tax identifier as stored, usually `12.345.678-9`.
  #[serde(rename = "rut_empresa", default, deserialize_with = "null_as_empty")]
  pub tax_id:    String,
  #[serde(rename = "id_minera", default)]
  pub mining_id: Option<i64>,
  /// The owning operator, when the backend joins it in.
  #[serde(rename = "Minera", default)]
  pub mining:    Option<MiningOperator>,
}

impl Company {
  pub fn mining_name(&self) -> &str {
    self.mining.as_ref().map(|m| m.name.as_str()).unwrap_or_default()
  }

  /// Label for company pickers: `"<mining> — <company>"`.
  pub fn option_label(&self) -> String {
    match self.mining_name() {
      "" => self.name.clone(),
      mining => format!("{mining} — {}", self.name),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Union {
  #[serde(rename = "id_sindicato", default)]
  pub id:         Option<i64>,
  #[serde(rename = "nombre_sindicato", default, deserialize_with = "null_as_empty")]
  pub name:       String,
  #[serde(rename = "federacion", default)]
  pub federation: Option<String>,
  /// Kept as text on read; only [`UnionKind`] values are ever written.
  #[serde(rename = "tipo_sindicato", default)]
  pub kind:       Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Monitoring {
  #[serde(rename = "id_monitoreo", default)]
  pub id:             Option<i64>,
  #[serde(rename = "id_negociacion", default)]
  pub negotiation_id: Option<i64>,
  #[serde(rename = "fecha_inicio_monitoreo", default)]
  pub start_date:     Option<String>,
  #[serde(rename = "comentarios", default)]
  pub comments:       Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
  #[serde(rename = "id_usuario", default)]
  pub id:      Option<i64>,
  #[serde(rename = "nombre", default, deserialize_with = "null_as_empty")]
  pub name:    String,
  #[serde(rename = "apellido", default, deserialize_with = "null_as_empty")]
  pub surname: String,
  #[serde(default, deserialize_with = "null_as_empty")]
  pub email:   String,
  /// Login handle.
  #[serde(rename = "usuario", default, deserialize_with = "null_as_empty")]
  pub handle:  String,
  #[serde(rename = "id_rol", default)]
  pub role_id: Option<i64>,
}

/// Read-only reference data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Role {
  #[serde(rename = "id_rol", default)]
  pub id:   Option<i64>,
  #[serde(rename = "nombre_rol", default, deserialize_with = "null_as_empty")]
  pub name: String,
}

/// Display name of the role with `id`, or `-` when unknown.
pub fn role_name(roles: &[Role], id: Option<i64>) -> &str {
  id.and_then(|id| roles.iter().find(|r| r.id == Some(id)))
    .map(|r| r.name.as_str())
    .unwrap_or("-")
}

/// The profile blob persisted next to the access token at login.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
  #[serde(rename = "id_usuario", default)]
  pub id:      Option<i64>,
  #[serde(rename = "nombre", default)]
  pub name:    Option<String>,
  #[serde(rename = "apellido", default)]
  pub surname: Option<String>,
  #[serde(rename = "usuario", default)]
  pub handle:  Option<String>,
  #[serde(rename = "id_rol", default)]
  pub role_id: Option<i64>,
}

impl UserProfile {
  pub fn is_admin(&self) -> bool { self.role_id == Some(ADMIN_ROLE_ID) }

  /// Full name when known, else the login handle.
  pub fn display_name(&self) -> String {
    match self.name.as_deref().filter(|n| !n.is_empty()) {
      Some(name) => format!("{name} {}", self.surname.as_deref().unwrap_or_default())
        .trim()
        .to_string(),
      None => self.handle.clone().unwrap_or_default(),
    }
  }
}
