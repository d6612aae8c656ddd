//! Aggregations over normalized records: yearly totals, category
//! comparison between two years, and list filtering.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::table::category::UNCATEGORIZED_AR;
use crate::table::ExpenseRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct YearStats {
  pub total: f64,
  pub count: usize,
}

/// Per-year totals, newest year first; non-numeric tags (e.g. "N/A") last.
pub fn yearly_stats(records: &[ExpenseRecord]) -> Vec<(String, YearStats)> {
  let mut stats: HashMap<String, YearStats> = HashMap::new();
  for record in records {
    let year = record.fields.eid_year.clone().unwrap_or_default();
    let entry = stats.entry(year).or_default();
    entry.total += record.fields.cost.unwrap_or(0.0);
    entry.count += 1;
  }

  let mut stats: Vec<_> = stats.into_iter().collect();
  stats.sort_by(|(a, _), (b, _)| compare_years_desc(a, b));
  stats
}

fn compare_years_desc(a: &str, b: &str) -> Ordering {
  let rank = |y: &str| y.parse::<i64>().unwrap_or(-1);
  rank(b).cmp(&rank(a)).then_with(|| a.cmp(b))
}

/// Percentage change of `current` over `previous`; `None` unless both have spend.
pub fn yearly_comparison(
  stats: &[(String, YearStats)],
  current: &str,
  previous: &str,
) -> Option<f64> {
  let total = |year: &str| {
    stats
      .iter()
      .find(|(y, _)| y == year)
      .map_or(0.0, |(_, s)| s.total)
  };

  let (current, previous) = (total(current), total(previous));
  if current != 0.0 && previous != 0.0 {
    Some((current - previous) / previous * 100.0)
  } else {
    None
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryComparison {
  pub category: String,
  pub current: f64,
  pub previous: f64,
}

/// Spend per category for two years, largest first, truncated to `limit`.
///
/// Ordering uses the current year's total, falling back to the previous
/// year's when the category has no spend this year.
pub fn category_comparison(
  records: &[ExpenseRecord],
  current: &str,
  previous: &str,
  limit: usize,
) -> Vec<CategoryComparison> {
  let mut totals: BTreeMap<String, CategoryComparison> = BTreeMap::new();

  for record in records {
    let year = record.fields.eid_year.as_deref().unwrap_or_default();
    if year != current && year != previous {
      continue;
    }
    let category = record
      .fields
      .arabic_category
      .clone()
      .unwrap_or_else(|| UNCATEGORIZED_AR.to_string());
    let entry = totals
      .entry(category.clone())
      .or_insert_with(|| CategoryComparison {
        category,
        current: 0.0,
        previous: 0.0,
      });
    let cost = record.fields.cost.unwrap_or(0.0);
    if year == current {
      entry.current += cost;
    } else {
      entry.previous += cost;
    }
  }

  let sort_key = |c: &CategoryComparison| if c.current != 0.0 { c.current } else { c.previous };
  let mut rows: Vec<_> = totals.into_values().collect();
  rows.sort_by(|a, b| sort_key(b).total_cmp(&sort_key(a)));
  rows.truncate(limit);
  rows
}

/// The label a record is grouped under: Arabic, then English, then uncategorized.
pub fn display_category(record: &ExpenseRecord) -> &str {
  record
    .fields
    .arabic_category
    .as_deref()
    .filter(|c| !c.is_empty())
    .or_else(|| record.fields.category.as_deref().filter(|c| !c.is_empty()))
    .unwrap_or(UNCATEGORIZED_AR)
}

/// Sorted unique display categories.
pub fn categories(records: &[ExpenseRecord]) -> Vec<String> {
  records
    .iter()
    .map(|r| display_category(r).to_string())
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect()
}

#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
  /// Display category (Arabic or English label)
  pub category: Option<String>,
  /// Case-insensitive substring of the item name
  pub search: Option<String>,
  pub year: Option<String>,
}

impl RecordFilter {
  pub fn matches(&self, record: &ExpenseRecord) -> bool {
    let category_ok = self.category.as_deref().map_or(true, |c| {
      display_category(record) == c || record.fields.category.as_deref() == Some(c)
    });

    let search_ok = self.search.as_deref().filter(|s| !s.is_empty()).map_or(true, |s| {
      record
        .fields
        .item
        .as_deref()
        .is_some_and(|item| item.to_lowercase().contains(&s.to_lowercase()))
    });

    let year_ok = self
      .year
      .as_deref()
      .map_or(true, |y| record.fields.eid_year.as_deref() == Some(y));

    category_ok && search_ok && year_ok
  }

  pub fn apply<'a>(&self, records: &'a [ExpenseRecord]) -> Vec<&'a ExpenseRecord> {
    records.iter().filter(|r| self.matches(r)).collect()
  }
}

/// Total cost of records not marked paid.
pub fn unpaid_total(records: &[ExpenseRecord]) -> f64 {
  records
    .iter()
    .filter(|r| !r.fields.is_paid())
    .map(|r| r.fields.cost.unwrap_or(0.0))
    .sum()
}
