//! Free-text filter over loaded collections.
//!
//! Purely in memory: the backend is never consulted.

use std::borrow::Cow;

use crate::{
  normalize::{MonitoringRow, NegotiationRow},
  record::{Company, MiningOperator, Union, User},
};

/// A record that exposes a fixed set of display fields to the filter.
pub trait Searchable {
  fn search_fields(&self) -> Vec<Cow<'_, str>>;
}

/// Whether `item` matches an already trimmed, lower-cased `needle`.
fn matches<T: Searchable + ?Sized>(item: &T, needle: &str) -> bool {
  item
    .search_fields()
    .iter()
    .filter(|f| !f.is_empty())
    .map(|f| &**f)
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase()
    .contains(needle)
}

/// Narrow `items` to those whose concatenated display fields contain
/// `query`, case-insensitively.
///
/// Order is preserved. A blank query yields every item; a query that matches
/// nothing yields an empty list.
pub fn filter_rows<'a, T: Searchable>(items: &'a [T], query: &str) -> Vec<&'a T> {
  let needle = query.trim().to_lowercase();
  if needle.is_empty() {
    return items.iter().collect();
  }
  items.iter().filter(|item| matches(*item, &needle)).collect()
}

// ─── Field sets ──────────────────────────────────────────────────────────────

impl Searchable for NegotiationRow {
  fn search_fields(&self) -> Vec<Cow<'_, str>> {
    vec![
      Cow::Borrowed(self.company.as_str()),
      Cow::Borrowed(self.company_tax_id.as_str()),
      Cow::Borrowed(self.mining.as_str()),
      Cow::Borrowed(self.union.as_str()),
      Cow::Borrowed(self.contract.as_str()),
      Cow::Borrowed(self.status.as_str()),
      Cow::Borrowed(self.start_date.as_str()),
      Cow::Borrowed(self.term_date.as_str()),
      Cow::Borrowed(self.expiry_date.as_str()),
    ]
  }
}

impl Searchable for Company {
  fn search_fields(&self) -> Vec<Cow<'_, str>> {
    vec![
      Cow::Borrowed(self.name.as_str()),
      Cow::Borrowed(self.tax_id.as_str()),
      Cow::Borrowed(self.mining_name()),
      self
        .mining_id
        .map(|id| Cow::Owned(id.to_string()))
        .unwrap_or_default(),
    ]
  }
}

impl Searchable for MiningOperator {
  fn search_fields(&self) -> Vec<Cow<'_, str>> { vec![Cow::Borrowed(self.name.as_str())] }
}

impl Searchable for Union {
  fn search_fields(&self) -> Vec<Cow<'_, str>> {
    vec![
      Cow::Borrowed(self.name.as_str()),
      Cow::Borrowed(self.federation.as_deref().unwrap_or_default()),
      Cow::Borrowed(self.kind.as_deref().unwrap_or_default()),
    ]
  }
}

impl Searchable for User {
  fn search_fields(&self) -> Vec<Cow<'_, str>> {
    vec![
      Cow::Borrowed(self.name.as_str()),
      Cow::Borrowed(self.surname.as_str()),
      Cow::Borrowed(self.email.as_str()),
      Cow::Borrowed(self.handle.as_str()),
    ]
  }
}

impl Searchable for MonitoringRow {
  fn search_fields(&self) -> Vec<Cow<'_, str>> {
    vec![
      self.entry.id.map(|id| Cow::Owned(id.to_string())).unwrap_or_default(),
      Cow::Borrowed(self.entry.comments.as_deref().unwrap_or_default()),
      Cow::Borrowed(self.entry.start_date.as_deref().unwrap_or_default()),
      Cow::Borrowed(self.negotiation.as_str()),
    ]
  }
}
