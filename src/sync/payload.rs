//! Shaping field payloads before they are sent to the datasheet.

use serde_json::Value;
use tracing::{debug, warn};

use crate::table::ExpenseFields;

/// Transient key some callers use to hand over uploaded blob URLs.
const ATTACHMENT_URLS_KEY: &str = "attachmentUrls";

/// Strip computed columns and fold attachment URLs into their text field.
///
/// - `Title`, `Created time` and `Last edited time` are server-assigned and
///   rejected on write.
/// - A transient `attachmentUrls` list is serialized into `Attachment URL`.
/// - The legacy `Attachment` descriptor column is never written.
pub fn prepare_fields(mut fields: ExpenseFields) -> ExpenseFields {
  if let Some(title) = fields.title.take() {
    debug!(title, "Removing auto-number Title field");
  }
  fields.created_time = None;
  fields.last_edited_time = None;

  if let Some(urls) = fields.extra.remove(ATTACHMENT_URLS_KEY) {
    match urls {
      Value::Array(items) => {
        let urls: Vec<String> = items
          .into_iter()
          .filter_map(|v| v.as_str().map(String::from))
          .collect();
        debug!(count = urls.len(), "Converting attachment URLs to text field");
        fields.set_attachment_urls(&urls);
      }
      other => warn!(value = %other, "Ignoring malformed attachment URL list"),
    }
  }

  if fields.attachment.take().is_some() {
    debug!("Dropping legacy Attachment field");
  }

  fields
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::table::types::Attachment;
  use serde_json::json;

  #[test]
  fn test_strips_server_assigned_fields() {
    let fields = ExpenseFields {
      title: Some(3.0),
      item: Some("Rice".into()),
      created_time: Some("2025-01-01".into()),
      last_edited_time: Some("2025-01-02".into()),
      attachment: Some(vec![Attachment::default()]),
      ..Default::default()
    };

    let prepared = prepare_fields(fields);
    assert_eq!(serde_json::to_value(&prepared).unwrap(), json!({ "Item": "Rice" }));
  }

  #[test]
  fn test_folds_transient_url_list() {
    let mut fields = ExpenseFields::default();
    fields.extra.insert(
      ATTACHMENT_URLS_KEY.to_string(),
      json!(["https://b/c/1.png", "https://b/c/2.png"]),
    );

    let prepared = prepare_fields(fields);
    assert!(!prepared.extra.contains_key(ATTACHMENT_URLS_KEY));
    assert_eq!(
      prepared.attachment_url.as_deref(),
      Some(r#"["https://b/c/1.png","https://b/c/2.png"]"#)
    );
  }

  #[test]
  fn test_keeps_existing_url_text_and_passthrough() {
    let mut fields = ExpenseFields {
      attachment_url: Some("https://b/c/1.png".into()),
      paid: Some(true),
      ..Default::default()
    };
    fields.extra.insert("Notes".into(), json!("bring cash"));

    let prepared = prepare_fields(fields.clone());
    assert_eq!(prepared, fields);
  }
}
