//! Row normalizer: flattens negotiation objects into one table row shape.
//!
//! Depending on the backend code path, a negotiation carries its company,
//! union and mining operator either as joined sub-objects (`Empresa`,
//! `Sindicato`, `Minera`) or as flat camelCase / snake_case strings. Every
//! row field is read through a prioritized list of source paths; the first
//! present, non-null, non-empty value wins and the default is `""`.

use std::fmt;

use serde_json::Value;
use uuid::Uuid;

use crate::record::Monitoring;

// ─── Source paths ────────────────────────────────────────────────────────────

const ID: &[&[&str]] = &[&["id_negociacion"], &["id"], &["ID"]];
const COMPANY: &[&[&str]] =
  &[&["Empresa", "nombre_empresa"], &["empresa"], &["nombre_empresa"]];
const COMPANY_TAX_ID: &[&[&str]] =
  &[&["Empresa", "rut_empresa"], &["rutEmpresa"], &["rut_empresa"]];
const MINING: &[&[&str]] = &[
  &["Empresa", "Minera", "nombre_minera"],
  &["Minera", "nombre_minera"],
  &["minera"],
  &["nombre_minera"],
];
const UNION: &[&[&str]] = &[
  &["Sindicato", "nombre_sindicato"],
  &["sindicato"],
  &["nombre_sindicato"],
];
const CONTRACT: &[&[&str]] = &[
  &["contrato"],
  &["codigoContrato"],
  &["codigo_contrato"],
  &["numContrato"],
  &["num_contrato"],
];
const STATUS: &[&[&str]] = &[&["estado"]];
const START: &[&[&str]] = &[&["fechaInicio"], &["fecha_inicio"], &["inicio"], &["fecha"]];
const TERM: &[&[&str]] = &[&["fechaTermino"], &["fecha_termino"], &["termino"]];
const EXPIRY: &[&[&str]] = &[
  &["vencimiento"],
  &["vencimientoContratoComercial"],
  &["vencimiento_contrato_comercial"],
  &["vencimiento_comercial"],
  &["fecha_vencimiento"],
];
const COMPANY_ID: &[&[&str]] = &[&["id_empresa"], &["Empresa", "id_empresa"]];
const UNION_ID: &[&[&str]] = &[&["id_sindicato"], &["Sindicato", "id_sindicato"]];

/// Scalar at `path` rendered as text; `None` for missing, null, empty or
/// non-scalar values.
fn scalar_at(value: &Value, path: &[&str]) -> Option<String> {
  let leaf = path.iter().try_fold(value, |v, key| v.get(key))?;
  match leaf {
    Value::String(s) if !s.is_empty() => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  }
}

fn pick(value: &Value, sources: &[&[&str]]) -> Option<String> {
  sources.iter().find_map(|path| scalar_at(value, path))
}

fn pick_text(value: &Value, sources: &[&[&str]]) -> String {
  pick(value, sources).unwrap_or_default()
}

/// Number at `key`, accepting numeric strings.
fn number_at(value: &Value, key: &str) -> Option<f64> {
  match value.get(key)? {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

// ─── Row identity ────────────────────────────────────────────────────────────

/// Identity of a table row.
///
/// Rows the server sent without any id get a random local placeholder so they
/// can still be keyed in lists. Only [`RowId::server`] values are ever placed
/// in a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowId {
  Server(String),
  Local(Uuid),
}

impl RowId {
  /// The server-side id, if this row has one.
  pub fn server(&self) -> Option<&str> {
    match self {
      Self::Server(id) => Some(id),
      Self::Local(_) => None,
    }
  }
}

impl fmt::Display for RowId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Server(id) => f.write_str(id),
      Self::Local(uuid) => write!(f, "local-{}", uuid.simple()),
    }
  }
}

// ─── Negotiation row ─────────────────────────────────────────────────────────

/// Flat negotiation row consumed by tables, filters and reports.
#[derive(Debug, Clone, PartialEq)]
pub struct NegotiationRow {
  pub id:                  RowId,
  pub company:             String,
  pub company_tax_id:      String,
  pub mining:              String,
  pub union:               String,
  pub contract:            String,
  /// Always lower case.
  pub status:              String,
  pub start_date:          String,
  pub term_date:           String,
  pub expiry_date:         String,
  pub company_id:          String,
  pub union_id:            String,
  pub total_headcount:     Option<f64>,
  pub unionized_headcount: Option<f64>,
  pub unionized_pct:       Option<f64>,
  /// The object as received, for edit-form prefill.
  pub raw:                 Value,
}

/// Flatten one server object into a [`NegotiationRow`]. Never fails.
pub fn normalize_negotiation(raw: &Value) -> NegotiationRow {
  let id = pick(raw, ID)
    .map(RowId::Server)
    .unwrap_or_else(|| RowId::Local(Uuid::new_v4()));

  NegotiationRow {
    id,
    company: pick_text(raw, COMPANY),
    company_tax_id: pick_text(raw, COMPANY_TAX_ID),
    mining: pick_text(raw, MINING),
    union: pick_text(raw, UNION),
    contract: pick_text(raw, CONTRACT),
    status: pick_text(raw, STATUS).to_lowercase(),
    start_date: pick_text(raw, START),
    term_date: pick_text(raw, TERM),
    expiry_date: pick_text(raw, EXPIRY),
    company_id: pick_text(raw, COMPANY_ID),
    union_id: pick_text(raw, UNION_ID),
    total_headcount: number_at(raw, "dotacion_total"),
    unionized_headcount: number_at(raw, "personal_sindicalizado"),
    unionized_pct: number_at(raw, "porcentaje_sindicalizado"),
    raw: raw.clone(),
  }
}

/// Normalize a whole collection, preserving order.
pub fn normalize_negotiations(items: &[Value]) -> Vec<NegotiationRow> {
  items.iter().map(normalize_negotiation).collect()
}

impl NegotiationRow {
  /// Label for negotiation pickers: `"<mining> — <company> — <contract>"`.
  pub fn option_label(&self) -> String {
    [&self.mining, &self.company, &self.contract]
      .into_iter()
      .filter(|s| !s.is_empty())
      .map(String::as_str)
      .collect::<Vec<_>>()
      .join(" — ")
  }

  /// Unionization percentage for display.
  ///
  /// The backend's own figure wins when present; otherwise it is derived
  /// from the headcounts with two decimals. `-` when neither is possible.
  pub fn unionized_pct_display(&self) -> String {
    if let Some(pct) = self.unionized_pct {
      return format!("{pct}%");
    }
    match (self.total_headcount, self.unionized_headcount) {
      (Some(total), Some(unionized)) if total > 0.0 => {
        format!("{:.2}%", unionized * 100.0 / total)
      }
      _ => "-".into(),
    }
  }

  /// A headcount for display, `-` when absent.
  pub fn headcount_display(count: Option<f64>) -> String {
    count.map(|c| c.to_string()).unwrap_or_else(|| "-".into())
  }
}

// ─── Monitoring row ──────────────────────────────────────────────────────────

/// A monitoring entry joined with the label of its negotiation.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoringRow {
  pub entry:       Monitoring,
  /// Empty when the negotiation is not among the loaded rows.
  pub negotiation: String,
}

/// Join monitoring entries with the negotiation rows they refer to.
pub fn monitoring_rows(
  entries: &[Monitoring],
  negotiations: &[NegotiationRow],
) -> Vec<MonitoringRow> {
  entries
    .iter()
    .map(|entry| {
      let negotiation = entry
        .negotiation_id
        .and_then(|id| {
          let id = id.to_string();
          negotiations.iter().find(|n| n.id.server() == Some(id.as_str()))
        })
        .map(NegotiationRow::option_label)
        .unwrap_or_default();
      MonitoringRow {
        entry: entry.clone(),
        negotiation,
      }
    })
    .collect()
}
