//! Tax-identifier (RUT) helpers and the advisory company duplicate guard.
//!
//! The guard only looks at the collection already loaded in the console. The
//! backend remains the authority and may still reject a submission.

use crate::{ValidationError, record::Company};

/// Reduce a tax id to its canonical form: digits and `K` only, upper-cased.
pub fn clean_tax_id(raw: &str) -> String {
  raw
    .chars()
    .filter(|c| c.is_ascii_digit() || matches!(c, 'k' | 'K'))
    .map(|c| c.to_ascii_uppercase())
    .collect()
}

/// Format a tax id as `12.345.678-9`: the body grouped in thousands with
/// dots, then a dash before the check digit. Empty input stays empty.
pub fn format_tax_id(raw: &str) -> String {
  let clean = clean_tax_id(raw);
  let Some(check) = clean.chars().last() else {
    return String::new();
  };
  let body = &clean[..clean.len() - 1];

  let mut grouped = String::with_capacity(body.len() + body.len() / 3);
  for (i, c) in body.chars().enumerate() {
    if i > 0 && (body.len() - i) % 3 == 0 {
      grouped.push('.');
    }
    grouped.push(c);
  }
  format!("{grouped}-{check}")
}

/// Reject a company whose tax id or name already exists under the same
/// mining operator.
///
/// Uniqueness is scoped per operator: the same tax id or name is accepted
/// under a different operator. `editing` excludes the record being updated.
pub fn check_duplicates(
  existing: &[Company],
  name: &str,
  tax_id: &str,
  mining_id: i64,
  editing: Option<i64>,
) -> Result<(), ValidationError> {
  let tax_id = clean_tax_id(tax_id);
  let name = name.trim().to_lowercase();

  let mut peers = existing
    .iter()
    .filter(|c| c.mining_id == Some(mining_id))
    .filter(|c| editing.is_none_or(|id| c.id != Some(id)));

  if peers.clone().any(|c| clean_tax_id(&c.tax_id) == tax_id) {
    return Err(ValidationError::new(
      "rut_empresa",
      "A company with this tax id already exists under the same mining operator.",
    ));
  }
  if peers.any(|c| c.name.trim().to_lowercase() == name) {
    return Err(ValidationError::new(
      "nombre_empresa",
      "A company with this name already exists under the same mining operator.",
    ));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn company(id: i64, name: &str, tax_id: &str, mining_id: i64) -> Company {
    Company {
      id: Some(id),
      name: name.into(),
      tax_id: tax_id.into(),
      mining_id: Some(mining_id),
      mining: None,
    }
  }

  #[test]
  fn clean_keeps_digits_and_check_letter() {
    assert_eq!(clean_tax_id("76.123.456-k"), "76123456K");
    assert_eq!(clean_tax_id(" 1-9 "), "19");
    assert_eq!(clean_tax_id("abc"), "");
  }

  #[test]
  fn format_groups_thousands() {
    assert_eq!(format_tax_id("761234565"), "76.123.456-5");
    assert_eq!(format_tax_id("12345678k"), "12.345.678-K");
    assert_eq!(format_tax_id("1234567-0"), "1.234.567-0");
    assert_eq!(format_tax_id("19"), "1-9");
    assert_eq!(format_tax_id("7"), "-7");
    assert_eq!(format_tax_id(""), "");
  }

  #[test]
  fn same_tax_id_under_same_operator_is_rejected() {
    let existing = vec![company(1, "Acme", "76.123.456-5", 10)];
    let err = check_duplicates(&existing, "Other", "761234565", 10, None).unwrap_err();
    assert_eq!(err.field, "rut_empresa");
  }

  #[test]
  fn same_tax_id_under_other_operator_is_allowed() {
    let existing = vec![company(1, "Acme", "76.123.456-5", 10)];
    assert!(check_duplicates(&existing, "Acme", "76.123.456-5", 11, None).is_ok());
  }

  #[test]
  fn name_comparison_is_trimmed_and_case_insensitive() {
    let existing = vec![company(1, "Acme Ltda", "1-9", 10)];
    let err = check_duplicates(&existing, "  ACME ltda ", "2-7", 10, None).unwrap_err();
    assert_eq!(err.field, "nombre_empresa");
  }

  #[test]
  fn the_record_being_edited_is_ignored() {
    let existing = vec![company(1, "Acme", "1-9", 10)];
    assert!(check_duplicates(&existing, "Acme", "1-9", 10, Some(1)).is_ok());
    assert!(check_duplicates(&existing, "Acme", "1-9", 10, Some(2)).is_err());
  }
}
