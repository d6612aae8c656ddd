//! Expense records as stored in the datasheet.
//!
//! Every documented field is optional: the store returns loosely typed rows,
//! and `normalize` fills the gaps on read.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::api_types::Field;

/// A single expense row. `record_id` is `None` until the store assigns one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
  #[serde(rename = "recordId", default, skip_serializing_if = "Option::is_none")]
  pub record_id: Option<String>,
  #[serde(default)]
  pub fields: ExpenseFields,
  #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<i64>,
  #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseFields {
  /// Server-assigned auto number
  #[serde(
    rename = "Title",
    default,
    skip_serializing_if = "Option::is_none",
    deserialize_with = "lenient_number"
  )]
  pub title: Option<f64>,
  /// Hijri year tag, e.g. "1446"
  #[serde(
    rename = "EidYear",
    default,
    skip_serializing_if = "Option::is_none",
    deserialize_with = "lenient_string"
  )]
  pub eid_year: Option<String>,
  #[serde(
    rename = "Item",
    default,
    skip_serializing_if = "Option::is_none",
    deserialize_with = "lenient_string"
  )]
  pub item: Option<String>,
  #[serde(
    rename = "Unit",
    default,
    skip_serializing_if = "Option::is_none",
    deserialize_with = "lenient_string"
  )]
  pub unit: Option<String>,
  #[serde(
    rename = "Quantity",
    default,
    skip_serializing_if = "Option::is_none",
    deserialize_with = "lenient_number"
  )]
  pub quantity: Option<f64>,
  #[serde(
    rename = "UnitPrice",
    default,
    skip_serializing_if = "Option::is_none",
    deserialize_with = "lenient_number"
  )]
  pub unit_price: Option<f64>,
  #[serde(
    rename = "Cost",
    default,
    skip_serializing_if = "Option::is_none",
    deserialize_with = "lenient_number"
  )]
  pub cost: Option<f64>,
  #[serde(
    rename = "Category",
    default,
    skip_serializing_if = "Option::is_none",
    deserialize_with = "lenient_string"
  )]
  pub category: Option<String>,
  #[serde(
    rename = "Arabic Category",
    default,
    skip_serializing_if = "Option::is_none",
    deserialize_with = "lenient_string"
  )]
  pub arabic_category: Option<String>,
  /// Read-only time columns; epoch milliseconds or a date string
  #[serde(rename = "Created time", default, skip_serializing_if = "Option::is_none")]
  pub created_time: Option<Value>,
  #[serde(
    rename = "Last edited time",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub last_edited_time: Option<Value>,
  /// Legacy attachment descriptors managed by the datasheet itself
  #[serde(
    rename = "Attachment",
    default,
    skip_serializing_if = "Option::is_none",
    deserialize_with = "lenient_attachments"
  )]
  pub attachment: Option<Vec<Attachment>>,
  /// Blob URLs, stored as a JSON array in a text field
  #[serde(
    rename = "Attachment URL",
    default,
    skip_serializing_if = "Option::is_none",
    deserialize_with = "text_or_list"
  )]
  pub attachment_url: Option<String>,
  #[serde(
    rename = "Paid",
    default,
    skip_serializing_if = "Option::is_none",
    deserialize_with = "lenient_bool"
  )]
  pub paid: Option<bool>,
  /// Any other column the datasheet returns
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
  #[serde(default)]
  pub id: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub size: u64,
  #[serde(default)]
  pub mime_type: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub token: Option<String>,
  #[serde(default)]
  pub url: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub width: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub height: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub thumbnail_url: Option<String>,
}

/// Everything a list call returns: rows plus column metadata.
///
/// This is also the payload of the cache slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
  #[serde(default)]
  pub records: Vec<ExpenseRecord>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub fields: Option<Vec<Field>>,
}

impl RecordSet {
  /// Apply the read-time repair pass to every record.
  pub fn normalized(self) -> Self {
    Self {
      records: super::normalize::normalize_records(self.records),
      fields: self.fields,
    }
  }
}

impl ExpenseFields {
  /// URLs held in the `Attachment URL` text field.
  ///
  /// The field holds either a JSON array of URLs or a single bare URL.
  pub fn attachment_urls(&self) -> Vec<String> {
    let raw = match self.attachment_url.as_deref().map(str::trim) {
      Some(raw) if !raw.is_empty() => raw,
      _ => return Vec::new(),
    };

    if raw.starts_with('[') && raw.ends_with(']') {
      match serde_json::from_str::<Vec<String>>(raw) {
        Ok(urls) => urls.into_iter().filter(|u| !u.is_empty()).collect(),
        Err(e) => {
          tracing::warn!(error = %e, "Failed to parse attachment URL list");
          Vec::new()
        }
      }
    } else {
      vec![raw.to_string()]
    }
  }

  /// Replace the attachment URL list.
  pub fn set_attachment_urls(&mut self, urls: &[String]) {
    self.attachment_url = if urls.is_empty() {
      None
    } else {
      serde_json::to_string(urls).ok()
    };
  }

  pub fn has_attachments(&self) -> bool {
    !self.attachment_urls().is_empty()
  }

  /// `quantity * unit_price`, when both are known.
  pub fn computed_cost(&self) -> Option<f64> {
    match (self.quantity, self.unit_price) {
      (Some(q), Some(p)) => Some(q * p),
      _ => None,
    }
  }

  pub fn is_paid(&self) -> bool {
    self.paid.unwrap_or(false)
  }
}

/// Build display descriptors for blob URLs.
pub fn attachments_from_urls(urls: &[String]) -> Vec<Attachment> {
  urls
    .iter()
    .enumerate()
    .map(|(index, url)| {
      let name = file_name_from_url(url).unwrap_or_else(|| format!("file-{}", index + 1));
      Attachment {
        id: format!("attachment-{}", index),
        mime_type: mime_type_for(&name).to_string(),
        name,
        size: 0,
        token: None,
        url: url.clone(),
        width: None,
        height: None,
        thumbnail_url: None,
      }
    })
    .collect()
}

fn file_name_from_url(url: &str) -> Option<String> {
  let without_query = url.split('?').next().unwrap_or(url);
  without_query
    .rsplit('/')
    .next()
    .filter(|s| !s.is_empty())
    .map(String::from)
}

/// Guess a mime type from a file extension.
pub fn mime_type_for(file_name: &str) -> &'static str {
  let ext = file_name
    .rsplit_once('.')
    .map(|(_, ext)| ext.to_lowercase())
    .unwrap_or_default();

  match ext.as_str() {
    "jpg" => "image/jpg",
    "jpeg" => "image/jpeg",
    "png" => "image/png",
    "gif" => "image/gif",
    "pdf" => "application/pdf",
    "doc" | "docx" => "application/msword",
    "xls" | "xlsx" => "application/vnd.ms-excel",
    _ => "application/octet-stream",
  }
}

// ============================================================================
// Lenient field decoding
// ============================================================================

/// Accept a number, a numeric string, or null.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Option::<Value>::deserialize(deserializer)?;
  Ok(match value {
    Some(Value::Number(n)) => n.as_f64(),
    Some(Value::String(s)) => s.trim().parse().ok(),
    _ => None,
  })
}

/// Accept a string or a number (year tags sometimes arrive numeric).
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Option::<Value>::deserialize(deserializer)?;
  Ok(match value {
    Some(Value::String(s)) => Some(s),
    Some(Value::Number(n)) => Some(n.to_string()),
    _ => None,
  })
}

/// Accept a bool, 0/1, or "true"/"false"; anything else is unknown.
fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Option::<Value>::deserialize(deserializer)?;
  Ok(match value {
    Some(Value::Bool(b)) => Some(b),
    Some(Value::Number(n)) => n.as_f64().map(|n| n != 0.0),
    Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
      "true" | "1" => Some(true),
      "false" | "0" => Some(false),
      _ => None,
    },
    _ => None,
  })
}

/// A list of attachment descriptors; a malformed list is dropped.
fn lenient_attachments<'de, D>(deserializer: D) -> Result<Option<Vec<Attachment>>, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Option::<Value>::deserialize(deserializer)?;
  Ok(match value {
    Some(list @ Value::Array(_)) => serde_json::from_value(list).ok(),
    _ => None,
  })
}

/// Accept the text form, or an already-decoded array of URLs.
fn text_or_list<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Option::<Value>::deserialize(deserializer)?;
  Ok(match value {
    Some(Value::String(s)) => Some(s),
    Some(list @ Value::Array(_)) => Some(list.to_string()),
    _ => None,
  })
}
