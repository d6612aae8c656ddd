//! Read-time repair of loosely typed records.
//!
//! Only fills gaps; a present value is never overwritten, so the pass is
//! idempotent.

use super::category::{Category, UNCATEGORIZED, UNCATEGORIZED_AR};
use super::types::{ExpenseFields, ExpenseRecord};

pub const DEFAULT_YEAR: &str = "N/A";
pub const DEFAULT_UNIT: &str = "حبة";
const ITEM_PREFIX: &str = "عنصر";
const UNKNOWN_ITEM: &str = "غير معروف";

/// Drop placeholder rows and repair the rest.
pub fn normalize_records(records: Vec<ExpenseRecord>) -> Vec<ExpenseRecord> {
  records
    .into_iter()
    .filter(|r| !is_test_record(r))
    .map(|mut r| {
      normalize_fields(&mut r.fields);
      r
    })
    .collect()
}

/// Rows whose item is literally "test" (any case) are placeholders.
pub fn is_test_record(record: &ExpenseRecord) -> bool {
  record
    .fields
    .item
    .as_deref()
    .is_some_and(|item| item.to_lowercase() == "test")
}

pub fn normalize_fields(fields: &mut ExpenseFields) {
  if is_blank(&fields.item) {
    let title = fields
      .title
      .map(|t| t.to_string())
      .unwrap_or_else(|| UNKNOWN_ITEM.to_string());
    fields.item = Some(format!("{} {}", ITEM_PREFIX, title));
  }

  if is_blank(&fields.eid_year) {
    fields.eid_year = Some(DEFAULT_YEAR.to_string());
  }

  match (is_blank(&fields.category), is_blank(&fields.arabic_category)) {
    (false, true) => {
      let english = fields.category.as_deref().unwrap_or_default();
      fields.arabic_category = Some(Category::arabic_for(english).to_string());
    }
    (true, false) => {
      let arabic = fields.arabic_category.as_deref().unwrap_or_default();
      fields.category = Some(Category::english_for(arabic).to_string());
    }
    (true, true) => {
      fields.category = Some(UNCATEGORIZED.to_string());
      fields.arabic_category = Some(UNCATEGORIZED_AR.to_string());
    }
    (false, false) => {}
  }

  if is_unset(fields.cost) && !is_unset(fields.quantity) && !is_unset(fields.unit_price) {
    fields.cost = fields.computed_cost();
  }

  if is_blank(&fields.unit) {
    fields.unit = Some(DEFAULT_UNIT.to_string());
  }
}

fn is_blank(value: &Option<String>) -> bool {
  value.as_deref().map_or(true, str::is_empty)
}

/// Zero counts as unset, matching how the datasheet reports empty number cells.
fn is_unset(value: Option<f64>) -> bool {
  value.map_or(true, |v| v == 0.0)
}
