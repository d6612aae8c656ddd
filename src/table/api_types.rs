//! Serde types matching the datasheet API envelopes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{ExpenseFields, ExpenseRecord};

// ============================================================================
// Response envelope
// ============================================================================

/// Every datasheet endpoint answers with `{code, success, message, data}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse<T> {
  #[serde(default)]
  pub code: i64,
  #[serde(default)]
  pub success: bool,
  #[serde(default)]
  pub message: String,
  pub data: Option<T>,
}

/// Response of a create/update/delete call, returned to the caller untouched.
pub type WriteResponse = ApiResponse<Value>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiListData {
  pub total: Option<u64>,
  #[serde(default)]
  pub records: Option<Vec<ExpenseRecord>>,
  #[serde(default)]
  pub fields: Option<Vec<Field>>,
}

// ============================================================================
// Field (column) metadata
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Field {
  pub id: String,
  pub name: String,
  #[serde(rename = "type")]
  pub field_type: String,
  #[serde(default)]
  pub editable: bool,
  #[serde(rename = "isPrimary", default, skip_serializing_if = "Option::is_none")]
  pub is_primary: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub property: Option<FieldProperty>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldProperty {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub precision: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub comma_style: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub format: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub include_time: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub options: Option<Vec<FieldOption>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldOption {
  pub id: String,
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub color: Option<FieldColor>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldColor {
  pub name: String,
  pub value: String,
}

// ============================================================================
// Write requests
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct WriteRequest {
  pub records: Vec<WriteRecord>,
}

/// One row in a create (`record_id` absent) or update request.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WriteRecord {
  #[serde(rename = "recordId", skip_serializing_if = "Option::is_none")]
  pub record_id: Option<String>,
  pub fields: ExpenseFields,
}
