//! Form drafts, the rules that gate their submission, and the payloads they
//! turn into.
//!
//! A draft holds the raw text of a form. `validate` checks the rules in a
//! fixed order, stops at the first failure and only then builds the payload,
//! so a rejected form never produces a request.

use std::str::FromStr;

use serde::Serialize;
use validator::ValidateEmail;

use crate::{
  ValidationError,
  company::{check_duplicates, format_tax_id},
  date::{add_months, months_between},
  normalize::NegotiationRow,
  record::{Company, NegotiationStatus, UnionKind, User},
};

/// Longest collective-contract term, in whole months.
pub const MAX_TERM_MONTHS: i32 = 36;

type Checked<T> = Result<T, ValidationError>;

fn blank(s: &str) -> bool { s.trim().is_empty() }

/// Trimmed text, or `None` when blank.
fn optional(s: &str) -> Option<String> {
  let s = s.trim();
  (!s.is_empty()).then(|| s.to_owned())
}

/// A selected reference id; blank or non-numeric counts as "not selected".
fn selected_id(field: &'static str, raw: &str, message: &str) -> Checked<i64> {
  raw
    .trim()
    .parse()
    .map_err(|_| ValidationError::new(field, message))
}

/// An optional count that must be a whole number `>= 0` when provided.
fn optional_count(field: &'static str, raw: &str, label: &str) -> Checked<Option<i64>> {
  let Some(raw) = optional(raw) else {
    return Ok(None);
  };
  match raw.parse::<i64>() {
    Ok(n) if n >= 0 => Ok(Some(n)),
    Ok(_) => Err(ValidationError::new(field, format!("{label} must be ≥ 0."))),
    Err(_) => Err(ValidationError::new(
      field,
      format!("{label} must be a whole number."),
    )),
  }
}

// ─── Negotiation ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NegotiationDraft {
  pub company_id:          String,
  pub union_id:            String,
  pub contract:            String,
  pub status:              NegotiationStatus,
  pub start_date:          String,
  pub term_date:           String,
  pub expiry_date:         String,
  pub total_headcount:     String,
  pub unionized_headcount: String,
  /// Only offered by some forms; blank means "let the backend compute it".
  pub unionized_pct:       String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NegotiationPayload {
  #[serde(rename = "id_empresa")]
  pub company_id:          i64,
  #[serde(rename = "id_sindicato")]
  pub union_id:            i64,
  #[serde(rename = "contrato")]
  pub contract:            String,
  #[serde(rename = "estado")]
  pub status:              String,
  #[serde(rename = "fecha_inicio", skip_serializing_if = "Option::is_none")]
  pub start_date:          Option<String>,
  #[serde(rename = "fecha_termino", skip_serializing_if = "Option::is_none")]
  pub term_date:           Option<String>,
  #[serde(
    rename = "vencimiento_contrato_comercial",
    skip_serializing_if = "Option::is_none"
  )]
  pub expiry_date:         Option<String>,
  #[serde(rename = "dotacion_total", skip_serializing_if = "Option::is_none")]
  pub total_headcount:     Option<i64>,
  #[serde(rename = "personal_sindicalizado", skip_serializing_if = "Option::is_none")]
  pub unionized_headcount: Option<i64>,
  #[serde(rename = "porcentaje_sindicalizado", skip_serializing_if = "Option::is_none")]
  pub unionized_pct:       Option<f64>,
}

impl NegotiationDraft {
  /// Prefill an edit form from a loaded row. The percentage starts blank
  /// since the backend derives it from the headcounts.
  pub fn from_row(row: &NegotiationRow) -> Self {
    let count = |c: Option<f64>| c.map(|c| c.to_string()).unwrap_or_default();
    Self {
      company_id:          row.company_id.clone(),
      union_id:            row.union_id.clone(),
      contract:            row.contract.clone(),
      status:              NegotiationStatus::from_str(&row.status).unwrap_or_default(),
      start_date:          row.start_date.clone(),
      term_date:           row.term_date.clone(),
      expiry_date:         row.expiry_date.clone(),
      total_headcount:     count(row.total_headcount),
      unionized_headcount: count(row.unionized_headcount),
      unionized_pct:       String::new(),
    }
  }

  /// Apply the negotiation rules in order, stopping at the first failure.
  pub fn validate(&self) -> Checked<NegotiationPayload> {
    let company_id = selected_id("id_empresa", &self.company_id, "Select a company.")?;
    let union_id = selected_id("id_sindicato", &self.union_id, "Select a union.")?;

    let contract = self.contract.trim();
    if contract.is_empty() {
      return Err(ValidationError::new("contrato", "Contract is required."));
    }

    if !blank(&self.start_date) && !blank(&self.term_date) {
      check_term(&self.start_date, &self.term_date)?;
    }

    let total_headcount =
      optional_count("dotacion_total", &self.total_headcount, "Total headcount")?;
    let unionized_headcount = optional_count(
      "personal_sindicalizado",
      &self.unionized_headcount,
      "Unionized headcount",
    )?;

    let unionized_pct = match optional(&self.unionized_pct) {
      None => None,
      Some(raw) => match raw.parse::<f64>() {
        Ok(pct) if (0.0..=100.0).contains(&pct) => Some(pct),
        _ => {
          return Err(ValidationError::new(
            "porcentaje_sindicalizado",
            "Unionization percentage must be between 0 and 100.",
          ));
        }
      },
    };

    Ok(NegotiationPayload {
      company_id,
      union_id,
      contract: contract.to_owned(),
      status: self.status.wire_value(),
      start_date: optional(&self.start_date),
      term_date: optional(&self.term_date),
      expiry_date: optional(&self.expiry_date),
      total_headcount,
      unionized_headcount,
      unionized_pct,
    })
  }
}

/// Both dates parse, the term does not precede the start, and the span is at
/// most [`MAX_TERM_MONTHS`].
fn check_term(start: &str, term: &str) -> Checked<()> {
  match months_between(start, term) {
    None => Err(ValidationError::new(
      "fecha_termino",
      "Check the date format (YYYY-MM-DD).",
    )),
    Some(m) if m < 0 => Err(ValidationError::new(
      "fecha_termino",
      "The term date cannot be earlier than the start date.",
    )),
    Some(m) if m > MAX_TERM_MONTHS => Err(ValidationError::new(
      "fecha_termino",
      format!("The collective contract term cannot exceed {MAX_TERM_MONTHS} months."),
    )),
    Some(_) => Ok(()),
  }
}

/// Suggested term date for a closed negotiation: start plus
/// [`MAX_TERM_MONTHS`].
///
/// Only offered when the status is closed, the start date is valid and no
/// term has been entered; a value the user typed is never replaced. Call it
/// on start-date or status transitions only.
pub fn suggest_term_date(
  status: NegotiationStatus,
  start_date: &str,
  current_term: &str,
) -> Option<String> {
  if status != NegotiationStatus::Closed || !blank(current_term) {
    return None;
  }
  let suggested = add_months(start_date, MAX_TERM_MONTHS);
  (!suggested.is_empty()).then_some(suggested)
}

// ─── Company ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompanyDraft {
  pub name:      String,
  /// As typed; formatted on submit.
  pub tax_id:    String,
  pub mining_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyPayload {
  #[serde(rename = "nombre_empresa")]
  pub name:      String,
  #[serde(rename = "rut_empresa")]
  pub tax_id:    String,
  #[serde(rename = "id_minera")]
  pub mining_id: i64,
}

impl CompanyDraft {
  pub fn from_company(c: &Company) -> Self {
    Self {
      name:      c.name.clone(),
      tax_id:    c.tax_id.clone(),
      mining_id: c.mining_id.map(|id| id.to_string()).unwrap_or_default(),
    }
  }

  /// Required fields, then the per-operator duplicate guard against
  /// `existing`. `editing` is the id of the company being updated.
  pub fn validate(
    &self,
    existing: &[Company],
    editing: Option<i64>,
  ) -> Checked<CompanyPayload> {
    let tax_id = format_tax_id(&self.tax_id);
    let missing = [
      ("nombre_empresa", blank(&self.name)),
      ("rut_empresa", tax_id.is_empty()),
      ("id_minera", blank(&self.mining_id)),
    ]
    .into_iter()
    .find_map(|(field, missing)| missing.then_some(field));
    if let Some(field) = missing {
      return Err(ValidationError::new(field, "All fields are required."));
    }
    let mining_id = selected_id("id_minera", &self.mining_id, "Select a mining operator.")?;
    let name = self.name.trim().to_owned();

    check_duplicates(existing, &name, &tax_id, mining_id, editing)?;

    Ok(CompanyPayload {
      name,
      tax_id,
      mining_id,
    })
  }
}

// ─── Mining operator ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MiningDraft {
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MiningPayload {
  #[serde(rename = "nombre_minera")]
  pub name: String,
}

impl MiningDraft {
  pub fn validate(&self) -> Checked<MiningPayload> {
    match optional(&self.name) {
      Some(name) => Ok(MiningPayload { name }),
      None => Err(ValidationError::new(
        "nombre_minera",
        "The mining operator name is required.",
      )),
    }
  }
}

// ─── Union ───────────────────────────────────────────────────────────────────

pub const MIN_UNION_NAME: usize = 3;
pub const MAX_FEDERATION: usize = 100;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnionDraft {
  pub name:       String,
  pub federation: String,
  /// Blank, or one of the [`UnionKind`] names.
  pub kind:       String,
}

/// Blank optional fields are sent as explicit `null`s so an update clears
/// them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnionPayload {
  #[serde(rename = "nombre_sindicato")]
  pub name:       String,
  #[serde(rename = "federacion")]
  pub federation: Option<String>,
  #[serde(rename = "tipo_sindicato")]
  pub kind:       Option<UnionKind>,
}

impl UnionDraft {
  pub fn from_union(u: &crate::record::Union) -> Self {
    Self {
      name:       u.name.clone(),
      federation: u.federation.clone().unwrap_or_default(),
      kind:       u.kind.clone().unwrap_or_default(),
    }
  }

  pub fn validate(&self) -> Checked<UnionPayload> {
    let name = self.name.trim();
    if name.chars().count() < MIN_UNION_NAME {
      return Err(ValidationError::new(
        "nombre_sindicato",
        format!("The name must have at least {MIN_UNION_NAME} characters."),
      ));
    }
    if self.federation.trim().chars().count() > MAX_FEDERATION {
      return Err(ValidationError::new(
        "federacion",
        format!("At most {MAX_FEDERATION} characters."),
      ));
    }
    let kind = match optional(&self.kind) {
      None => None,
      Some(kind) => Some(UnionKind::from_str(&kind).map_err(|_| {
        ValidationError::new("tipo_sindicato", "Unknown union type.")
      })?),
    };

    Ok(UnionPayload {
      name: name.to_owned(),
      federation: optional(&self.federation),
      kind,
    })
  }
}

// ─── User ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserDraft {
  pub name:     String,
  pub surname:  String,
  pub email:    String,
  pub handle:   String,
  pub role_id:  String,
  /// Only required, and only sent, when creating.
  pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserPayload {
  #[serde(rename = "nombre")]
  pub name:     String,
  #[serde(rename = "apellido")]
  pub surname:  String,
  pub email:    String,
  #[serde(rename = "usuario")]
  pub handle:   String,
  #[serde(rename = "id_rol")]
  pub role_id:  i64,
  #[serde(rename = "contrasena", skip_serializing_if = "Option::is_none")]
  pub password: Option<String>,
}

impl UserDraft {
  pub fn from_user(u: &User) -> Self {
    Self {
      name:     u.name.clone(),
      surname:  u.surname.clone(),
      email:    u.email.clone(),
      handle:   u.handle.clone(),
      role_id:  u.role_id.map(|id| id.to_string()).unwrap_or_default(),
      password: String::new(),
    }
  }

  /// `creating` selects the create-mode rules (password required).
  pub fn validate(&self, creating: bool) -> Checked<UserPayload> {
    let required = |field: &'static str, value: &str| -> Checked<String> {
      optional(value).ok_or_else(|| ValidationError::new(field, "Required."))
    };

    let name = required("nombre", &self.name)?;
    let surname = required("apellido", &self.surname)?;
    let email = required("email", &self.email)?;
    if !email.validate_email() {
      return Err(ValidationError::new("email", "Invalid email format."));
    }
    let handle = required("usuario", &self.handle)?.to_lowercase();
    if creating && blank(&self.password) {
      return Err(ValidationError::new(
        "contrasena",
        "Password is required when creating a user.",
      ));
    }
    let role_id = selected_id("id_rol", &self.role_id, "Select a role.")?;

    Ok(UserPayload {
      name,
      surname,
      email,
      handle,
      role_id,
      password: creating.then(|| self.password.clone()),
    })
  }
}

// ─── Monitoring ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitoringDraft {
  pub negotiation_id: String,
  pub start_date:     String,
  pub comments:       String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitoringPayload {
  #[serde(rename = "id_negociacion")]
  pub negotiation_id: i64,
  #[serde(rename = "fecha_inicio_monitoreo", skip_serializing_if = "Option::is_none")]
  pub start_date:     Option<String>,
  #[serde(rename = "comentarios")]
  pub comments:       String,
}

impl MonitoringDraft {
  pub fn from_entry(m: &crate::record::Monitoring) -> Self {
    Self {
      negotiation_id: m.negotiation_id.map(|id| id.to_string()).unwrap_or_default(),
      start_date:     m.start_date.clone().unwrap_or_default(),
      comments:       m.comments.clone().unwrap_or_default(),
    }
  }

  /// A blank start date defaults to the start date of the referenced
  /// negotiation among `negotiations`.
  pub fn validate(&self, negotiations: &[NegotiationRow]) -> Checked<MonitoringPayload> {
    let negotiation_id = selected_id(
      "id_negociacion",
      &self.negotiation_id,
      "Select a negotiation.",
    )?;

    let start_date = match optional(&self.start_date) {
      Some(date) if crate::date::parse_strict_date(&date).is_none() => {
        return Err(ValidationError::new(
          "fecha_inicio_monitoreo",
          "Check the date format (YYYY-MM-DD).",
        ));
      }
      Some(date) => Some(date),
      None => {
        let id = negotiation_id.to_string();
        negotiations
          .iter()
          .find(|n| n.id.server() == Some(id.as_str()))
          .and_then(|n| optional(&n.start_date))
      }
    };

    Ok(MonitoringPayload {
      negotiation_id,
      start_date,
      comments: self.comments.clone(),
    })
  }
}
