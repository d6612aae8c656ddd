use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::Url;

use crate::config::Config;
use crate::sync::SyncError;

use super::api_types::{ApiListData, ApiResponse, WriteRecord, WriteRequest, WriteResponse};
use super::types::RecordSet;

/// Rows requested per list page (the datasheet's maximum).
const PAGE_SIZE: u64 = 1000;

/// The remote table store, as seen by the sync layer.
#[async_trait]
pub trait RecordStore: Send + Sync {
  /// Fetch every row plus column metadata.
  async fn list_records(&self) -> Result<RecordSet, SyncError>;

  async fn create_records(&self, records: Vec<WriteRecord>) -> Result<WriteResponse, SyncError>;

  async fn update_records(&self, records: Vec<WriteRecord>) -> Result<WriteResponse, SyncError>;

  async fn delete_records(&self, record_ids: &[String]) -> Result<WriteResponse, SyncError>;
}

/// Datasheet API client
#[derive(Clone)]
pub struct TableClient {
  http: reqwest::Client,
  base_url: String,
  token: String,
}

impl TableClient {
  pub fn new(config: &Config) -> Result<Self> {
    let token = Config::get_api_token()?;
    Self::with_token(&config.table.url, token)
  }

  pub fn with_token(base_url: &str, token: String) -> Result<Self> {
    Url::parse(base_url).map_err(|e| eyre!("Invalid datasheet URL {}: {}", base_url, e))?;

    let http = reqwest::Client::builder()
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url: base_url.trim_end_matches('/').to_string(),
      token,
    })
  }

  /// Build `<base>/records` with the given query pairs.
  fn records_url(&self, query: &[(&str, String)]) -> Result<Url, SyncError> {
    let mut url = Url::parse(&format!("{}/records", self.base_url))
      .map_err(|e| SyncError::Parse(format!("invalid records URL: {}", e)))?;
    {
      let mut pairs = url.query_pairs_mut();
      for (key, value) in query {
        pairs.append_pair(key, value);
      }
    }
    Ok(url)
  }

  fn request(&self, method: Method, url: Url) -> RequestBuilder {
    self.http.request(method, url).bearer_auth(&self.token)
  }

  /// Send a request and unwrap the `{code, success, message, data}` envelope.
  async fn send<T: DeserializeOwned>(
    &self,
    request: RequestBuilder,
  ) -> Result<ApiResponse<T>, SyncError> {
    let response = request
      .send()
      .await
      .map_err(|e| SyncError::Network(e.to_string()))?;

    let status = response.status();
    let body = response
      .text()
      .await
      .map_err(|e| SyncError::Network(e.to_string()))?;

    if !status.is_success() {
      return Err(SyncError::Api {
        status: i64::from(status.as_u16()),
        message: error_message(&body).unwrap_or_else(|| status.to_string()),
      });
    }

    let envelope: ApiResponse<T> = serde_json::from_str(&body)
      .map_err(|e| SyncError::Parse(format!("unexpected response: {}", e)))?;

    if !envelope.success {
      return Err(SyncError::Api {
        status: envelope.code,
        message: envelope.message,
      });
    }

    Ok(envelope)
  }

  async fn write(&self, method: Method, records: Vec<WriteRecord>) -> Result<WriteResponse, SyncError> {
    let url = self.records_url(&[("fieldKey", "name".to_string())])?;
    debug!(%method, count = records.len(), "Sending write request");
    self
      .send(self.request(method, url).json(&WriteRequest { records }))
      .await
  }
}

#[async_trait]
impl RecordStore for TableClient {
  async fn list_records(&self) -> Result<RecordSet, SyncError> {
    let mut set = RecordSet::default();
    let mut page_num = 1u64;

    loop {
      let url = self.records_url(&[
        ("fieldKey", "name".to_string()),
        ("pageSize", PAGE_SIZE.to_string()),
        ("pageNum", page_num.to_string()),
      ])?;

      let response: ApiResponse<ApiListData> = self.send(self.request(Method::GET, url)).await?;
      let data = response.data.unwrap_or_default();

      let page = data.records.unwrap_or_default();
      let page_len = page.len() as u64;
      set.records.extend(page);
      if set.fields.is_none() {
        set.fields = data.fields;
      }

      // Check if we've fetched all records
      let total = data.total.unwrap_or(0);
      if page_len == 0 || set.records.len() as u64 >= total {
        break;
      }
      page_num += 1;
    }

    info!(count = set.records.len(), "Fetched records from datasheet");
    Ok(set)
  }

  async fn create_records(&self, records: Vec<WriteRecord>) -> Result<WriteResponse, SyncError> {
    self.write(Method::POST, records).await
  }

  async fn update_records(&self, records: Vec<WriteRecord>) -> Result<WriteResponse, SyncError> {
    self.write(Method::PATCH, records).await
  }

  async fn delete_records(&self, record_ids: &[String]) -> Result<WriteResponse, SyncError> {
    let url = self.records_url(&[("recordIds", record_ids.join(","))])?;
    debug!(ids = ?record_ids, "Sending delete request");
    self.send(self.request(Method::DELETE, url)).await
  }
}

/// Pull `message` out of an error body, if it is a JSON envelope.
fn error_message(body: &str) -> Option<String> {
  let value: serde_json::Value = serde_json::from_str(body).ok()?;
  value
    .get("message")
    .and_then(|m| m.as_str())
    .filter(|m| !m.is_empty())
    .map(String::from)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::table::ExpenseFields;
  use serde_json::json;
  use std::sync::{Arc, Mutex};
  use tokio::io::{AsyncReadExt, AsyncWriteExt};
  use tokio::net::{TcpListener, TcpStream};

  /// Local HTTP stub: each connection gets the next canned `(status, body)`.
  /// Returns the datasheet URL and the raw requests it received.
  async fn stub(responses: Vec<(u16, String)>) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);

    tokio::spawn(async move {
      for (status, body) in responses {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        log.lock().unwrap().push(request);
        let reply = format!(
          "HTTP/1.1 {} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
          status,
          body.len(),
          body
        );
        socket.write_all(reply.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
      }
    });

    (format!("http://{}/fusion/v1/datasheets/dst1", addr), seen)
  }

  /// Read one request (head plus `content-length` body), lowercased.
  async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
      let n = socket.read(&mut chunk).await.unwrap();
      if n == 0 {
        break;
      }
      buf.extend_from_slice(&chunk[..n]);

      let text = String::from_utf8_lossy(&buf).to_lowercase();
      if let Some(end) = text.find("\r\n\r\n") {
        let body_len = text[..end]
          .lines()
          .find_map(|l| l.strip_prefix("content-length:"))
          .and_then(|v| v.trim().parse::<usize>().ok())
          .unwrap_or(0);
        if buf.len() >= end + 4 + body_len {
          break;
        }
      }
    }
    String::from_utf8_lossy(&buf).to_lowercase()
  }

  fn page(total: Option<u64>, items: &[&str]) -> (u16, String) {
    let records: Vec<_> = items
      .iter()
      .enumerate()
      .map(|(i, item)| json!({ "recordId": format!("rec{}", i), "fields": { "Item": item } }))
      .collect();
    let mut data = json!({ "records": records });
    if let Some(total) = total {
      data["total"] = json!(total);
    }
    let body = json!({ "code": 200, "success": true, "message": "SUCCESS", "data": data });
    (200, body.to_string())
  }

  fn ok_write() -> (u16, String) {
    (200, json!({ "code": 200, "success": true, "message": "SUCCESS", "data": {} }).to_string())
  }

  fn stub_client(url: &str) -> TableClient {
    TableClient::with_token(url, "tok".into()).unwrap()
  }

  #[tokio::test]
  async fn test_list_follows_pages_until_total() {
    let (url, seen) = stub(vec![page(Some(3), &["a", "b"]), page(Some(3), &["c"])]).await;

    let set = stub_client(&url).list_records().await.unwrap();

    assert_eq!(set.records.len(), 3);
    assert_eq!(set.records[2].fields.item.as_deref(), Some("c"));
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].starts_with("get /fusion/v1/datasheets/dst1/records?"));
    assert!(seen[0].contains("pagesize=1000"));
    assert!(seen[0].contains("pagenum=1"));
    assert!(seen[0].contains("authorization: bearer tok"));
    assert!(seen[1].contains("pagenum=2"));
  }

  #[tokio::test]
  async fn test_list_stops_on_empty_page_or_missing_total() {
    let (url, seen) = stub(vec![page(Some(5), &["a", "b"]), page(Some(5), &[])]).await;
    let set = stub_client(&url).list_records().await.unwrap();
    assert_eq!(set.records.len(), 2);
    assert_eq!(seen.lock().unwrap().len(), 2);

    let (url, seen) = stub(vec![page(None, &["a"])]).await;
    let set = stub_client(&url).list_records().await.unwrap();
    assert_eq!(set.records.len(), 1);
    assert_eq!(seen.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn test_unsuccessful_envelope_is_api_error() {
    let body = json!({ "code": 301, "success": false, "message": "record not found" });
    let (url, _) = stub(vec![(200, body.to_string())]).await;

    let err = stub_client(&url)
      .delete_records(&["rec9".to_string()])
      .await
      .unwrap_err();
    match err {
      SyncError::Api { status, message } => {
        assert_eq!(status, 301);
        assert_eq!(message, "record not found");
      }
      other => panic!("unexpected error {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_http_error_status_is_api_error() {
    let body = json!({ "code": 401, "success": false, "message": "bad token" });
    let (url, _) = stub(vec![(401, body.to_string()), (500, "<html>".into())]).await;
    let client = stub_client(&url);

    match client.list_records().await.unwrap_err() {
      SyncError::Api { status, message } => {
        assert_eq!(status, 401);
        assert_eq!(message, "bad token");
      }
      other => panic!("unexpected error {:?}", other),
    }

    let err = client.list_records().await.unwrap_err();
    assert!(matches!(err, SyncError::Api { status: 500, .. }));
    assert!(!err.is_connectivity());
  }

  #[tokio::test]
  async fn test_writes_use_field_names_and_record_ids() {
    let (url, seen) = stub(vec![ok_write(), ok_write()]).await;
    let client = stub_client(&url);

    let record = WriteRecord {
      record_id: None,
      fields: ExpenseFields {
        item: Some("Rice".into()),
        ..Default::default()
      },
    };
    let response = client.create_records(vec![record]).await.unwrap();
    assert!(response.success);
    client
      .delete_records(&["rec1".to_string(), "rec2".to_string()])
      .await
      .unwrap();

    let seen = seen.lock().unwrap();
    assert!(seen[0].starts_with("post /fusion/v1/datasheets/dst1/records?fieldkey=name "));
    assert!(seen[0].contains(r#"{"records":[{"fields":{"item":"rice"}}]}"#));
    assert!(seen[1].starts_with("delete /fusion/v1/datasheets/dst1/records?recordids=rec1%2crec2 "));
  }

  #[tokio::test]
  async fn test_unreachable_server_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = stub_client(&format!("http://{}/dst1", addr));
    let err = client.list_records().await.unwrap_err();
    assert!(matches!(err, SyncError::Network(_)));
  }

  fn client() -> TableClient {
    TableClient::with_token("https://aitable.example/fusion/v1/datasheets/dst1/", "tok".into())
      .unwrap()
  }

  #[test]
  fn test_records_url_keeps_datasheet_path() {
    let url = client()
      .records_url(&[("fieldKey", "name".to_string())])
      .unwrap();
    assert_eq!(
      url.as_str(),
      "https://aitable.example/fusion/v1/datasheets/dst1/records?fieldKey=name"
    );
  }

  #[test]
  fn test_delete_url_joins_ids() {
    let url = client()
      .records_url(&[("recordIds", ["rec1", "rec2"].join(","))])
      .unwrap();
    assert_eq!(url.query(), Some("recordIds=rec1%2Crec2"));
  }

  #[test]
  fn test_rejects_invalid_base_url() {
    assert!(TableClient::with_token("not a url", "tok".into()).is_err());
  }

  #[test]
  fn test_error_message_extraction() {
    assert_eq!(
      error_message(r#"{"code":401,"success":false,"message":"bad token"}"#).as_deref(),
      Some("bad token")
    );
    assert_eq!(error_message("<html>"), None);
  }
}
