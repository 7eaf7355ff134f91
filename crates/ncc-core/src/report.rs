//! Structured report filters and pagination over negotiation rows.

use chrono::NaiveDate;

use crate::{date::parse_strict_date, normalize::NegotiationRow};

/// Report criteria. Blank / `None` criteria do not filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportFilter {
  /// Exact mining operator name.
  pub mining:   String,
  /// Exact status, compared in lower case.
  pub status:   String,
  /// Case-insensitive substring of the company tax id.
  pub tax_id:   String,
  /// Case-insensitive substring of the contract id.
  pub contract: String,
  pub from:     Option<NaiveDate>,
  pub to:       Option<NaiveDate>,
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
  haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl ReportFilter {
  pub fn is_empty(&self) -> bool { *self == Self::default() }

  /// The date a row is ranged on: the first present of start, term and
  /// commercial expiry.
  fn reference_date(row: &NegotiationRow) -> Option<&str> {
    [&row.start_date, &row.term_date, &row.expiry_date]
      .into_iter()
      .map(String::as_str)
      .find(|d| !d.is_empty())
  }

  pub fn matches(&self, row: &NegotiationRow) -> bool {
    if !self.mining.is_empty() && row.mining != self.mining {
      return false;
    }
    if !self.status.is_empty() && row.status != self.status.to_lowercase() {
      return false;
    }
    if !self.tax_id.is_empty() && !contains_ci(&row.company_tax_id, &self.tax_id) {
      return false;
    }
    if !self.contract.is_empty() && !contains_ci(&row.contract, &self.contract) {
      return false;
    }
    if self.from.is_some() || self.to.is_some() {
      // A row without a usable date cannot be placed in the range.
      let Some(date) = Self::reference_date(row).and_then(parse_strict_date) else {
        return false;
      };
      if self.from.is_some_and(|from| date < from) || self.to.is_some_and(|to| date > to) {
        return false;
      }
    }
    true
  }

  pub fn apply<'a>(&self, rows: &'a [NegotiationRow]) -> Vec<&'a NegotiationRow> {
    rows.iter().filter(|r| self.matches(r)).collect()
  }
}

/// One page of a filtered report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPage<'a> {
  pub rows:      Vec<&'a NegotiationRow>,
  /// 1-based, clamped to `1..=pages`.
  pub page:      usize,
  /// Never less than one, even for an empty report.
  pub pages:     usize,
  /// Matching rows across all pages.
  pub total:     usize,
}

/// Slice `matching` into page `page` (1-based) of `page_size` rows. An out of
/// range page is clamped to the last one.
pub fn paginate<'a>(
  matching: Vec<&'a NegotiationRow>,
  page: usize,
  page_size: usize,
) -> ReportPage<'a> {
  let page_size = page_size.max(1);
  let total = matching.len();
  let pages = total.div_ceil(page_size).max(1);
  let page = page.clamp(1, pages);

  let rows = matching
    .into_iter()
    .skip((page - 1) * page_size)
    .take(page_size)
    .collect();

  ReportPage {
    rows,
    page,
    pages,
    total,
  }
}
