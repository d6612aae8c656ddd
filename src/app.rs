use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

use crate::blob::{BlobUploader, UploadFile};
use crate::cache::{CacheLayer, CacheResult, SqliteStorage};
use crate::commands::{Command, RecordArgs};
use crate::config::Config;
use crate::network::{Connectivity, NetworkStatus};
use crate::session::{AuthenticatedUser, Session};
use crate::summary::{self, RecordFilter};
use crate::sync::{SyncError, SyncLayer, CACHE_KEY_RECORDS};
use crate::table::types::attachments_from_urls;
use crate::table::{Category, ExpenseFields, ExpenseRecord, RecordSet, TableClient};

type RecordSync = SyncLayer<SqliteStorage, TableClient, NetworkStatus>;

/// Main application state
///
/// The connectivity probe and the datasheet client are set up on first use,
/// so session commands work without a token or a network.
pub struct App {
  config: Config,
  storage: Arc<SqliteStorage>,
  session: Session<SqliteStorage>,
  network: Arc<NetworkStatus>,
  force_offline: bool,
  probed: OnceCell<()>,
  sync: OnceCell<RecordSync>,
}

impl App {
  pub fn new(config: Config, force_offline: bool) -> Result<Self> {
    let storage = Arc::new(SqliteStorage::open()?);
    Ok(Self::with_storage(config, storage, force_offline))
  }

  pub fn with_storage(config: Config, storage: Arc<SqliteStorage>, force_offline: bool) -> Self {
    let session = Session::new(
      Arc::clone(&storage),
      config.users.clone(),
      config.locked_years.clone(),
    );

    Self {
      config,
      storage,
      session,
      network: Arc::new(NetworkStatus::default()),
      force_offline,
      probed: OnceCell::new(),
      sync: OnceCell::new(),
    }
  }

  /// Connectivity, probed once per run.
  async fn network(&self) -> &NetworkStatus {
    self
      .probed
      .get_or_init(|| async {
        if self.force_offline {
          self.network.set_offline();
        } else {
          self.network.probe(&self.config.table.url).await;
        }
      })
      .await;
    &self.network
  }

  async fn sync(&self) -> Result<&RecordSync> {
    self.network().await;
    self
      .sync
      .get_or_try_init(|| async {
        let client = TableClient::new(&self.config)?;
        let cache = CacheLayer::new(Arc::clone(&self.storage), CACHE_KEY_RECORDS)
          .with_ttl(self.config.cache.ttl());
        Ok::<_, color_eyre::Report>(SyncLayer::new(client, cache, Arc::clone(&self.network)))
      })
      .await
  }

  /// Fail before any blob request when offline.
  async fn ensure_online(&self, action: &'static str) -> Result<()> {
    if self.network().await.is_online() {
      Ok(())
    } else {
      Err(SyncError::Offline(action).into())
    }
  }

  pub async fn run(&self, command: Command) -> Result<()> {
    match command {
      Command::Login { phone } => self.login(&phone),
      Command::Logout => {
        self.session.logout()?;
        println!("Signed out");
        Ok(())
      }
      Command::Whoami => self.whoami(),
      Command::List {
        refresh,
        category,
        search,
        year,
        links,
      } => {
        let filter = RecordFilter {
          category,
          search,
          year,
        };
        self.list(refresh, filter, links).await
      }
      Command::Summary {
        refresh,
        year,
        compare,
      } => self.summary(refresh, &year, &compare).await,
      Command::Categories => self.categories().await,
      Command::Add(args) => self.add(args).await,
      Command::Update { record_id, args } => self.update(&record_id, args).await,
      Command::Delete { record_id } => self.delete(&record_id).await,
      Command::Upload { files } => self.upload(&files).await,
    }
  }

  fn login(&self, phone: &str) -> Result<()> {
    let user = self.session.login(phone)?;
    print_user(&user);
    Ok(())
  }

  fn whoami(&self) -> Result<()> {
    let user = self.session.current()?;
    print_user(&user);
    Ok(())
  }

  /// Every read goes through the session check and the sync layer.
  async fn load(&self, refresh: bool) -> Result<CacheResult<RecordSet>> {
    self.session.current()?;
    let result = self.sync().await?.get_records(refresh).await?;

    let when = result
      .cached_at
      .map(|t| format!(" at {}", t.format("%Y-%m-%d %H:%M")))
      .unwrap_or_default();
    let offline = if self.network().await.is_online() { "" } else { " [offline]" };
    eprintln!(
      "{} records {}{}{}",
      result.data.records.len(),
      result.source.describe(),
      when,
      offline
    );
    Ok(result)
  }

  async fn list(&self, refresh: bool, filter: RecordFilter, links: bool) -> Result<()> {
    let uploader = if links { Some(self.uploader()?) } else { None };
    let result = self.load(refresh).await?;
    let records = filter.apply(&result.data.records);

    for record in &records {
      print_record(record, uploader.as_ref());
    }
    if records.is_empty() {
      println!("No records");
    }
    Ok(())
  }

  async fn categories(&self) -> Result<()> {
    for category in Category::ALL {
      println!("{:<28} {}", category.english(), category.arabic());
    }

    if self.session.restore()?.is_some() {
      let result = self.load(false).await?;
      println!("In use:");
      for label in summary::categories(&result.data.records) {
        println!("  {}", label);
      }
    }
    Ok(())
  }

  async fn summary(&self, refresh: bool, year: &str, compare: &str) -> Result<()> {
    let result = self.load(refresh).await?;
    let records = &result.data.records;

    println!("Totals by year:");
    let stats = summary::yearly_stats(records);
    for (y, s) in &stats {
      println!("  {:<6} {:>12.2}  ({} records)", y, s.total, s.count);
    }
    if let Some(change) = summary::yearly_comparison(&stats, year, compare) {
      println!("  {} vs {}: {:+.1}%", year, compare, change);
    }

    println!("Categories ({} vs {}):", year, compare);
    for row in summary::category_comparison(records, year, compare, 6) {
      println!(
        "  {:<32} {:>12.2} {:>12.2}",
        row.category, row.current, row.previous
      );
    }

    println!("Unpaid: {:.2}", summary::unpaid_total(records));
    Ok(())
  }

  async fn add(&self, args: RecordArgs) -> Result<()> {
    let user = self.session.current()?;
    self.session.ensure_can_write(&user, None)?;

    let mut fields = args.to_fields().map_err(|e| eyre!(e))?;
    if fields.item.as_deref().map_or(true, str::is_empty) {
      return Err(eyre!("--item is required"));
    }
    if fields.eid_year.is_none() {
      return Err(eyre!("--year is required"));
    }
    fields.cost = fields.computed_cost();

    self.attach(&mut fields, &args, &[]).await?;

    let response = self
      .sync()
      .await?
      .add_record(fields)
      .await
      .map_err(|e| write_error("add", e))?;
    info!(message = %response.message, "Record added");
    println!("Record added");
    Ok(())
  }

  async fn update(&self, record_id: &str, args: RecordArgs) -> Result<()> {
    let user = self.session.current()?;
    let existing = self.find(record_id).await?;
    self.session.ensure_can_write(&user, Some(&existing))?;

    let mut fields = args.to_fields().map_err(|e| eyre!(e))?;
    if fields.quantity.is_some() || fields.unit_price.is_some() {
      let quantity = fields.quantity.or(existing.fields.quantity);
      let unit_price = fields.unit_price.or(existing.fields.unit_price);
      fields.cost = quantity.zip(unit_price).map(|(q, p)| q * p);
    }

    self
      .attach(&mut fields, &args, &existing.fields.attachment_urls())
      .await?;

    self
      .sync()
      .await?
      .update_record(record_id, fields)
      .await
      .map_err(|e| write_error("update", e))?;
    println!("Record {} updated", record_id);
    Ok(())
  }

  async fn delete(&self, record_id: &str) -> Result<()> {
    let user = self.session.current()?;
    let existing = self.find(record_id).await?;
    self.session.ensure_can_write(&user, Some(&existing))?;

    self
      .sync()
      .await?
      .delete_record(record_id)
      .await
      .map_err(|e| write_error("delete", e))?;
    println!("Record {} deleted", record_id);
    Ok(())
  }

  async fn upload(&self, files: &[PathBuf]) -> Result<()> {
    let user = self.session.current()?;
    self.session.ensure_can_write(&user, None)?;
    self.ensure_online("upload files").await?;

    let uploader = self.uploader()?;
    for path in files {
      let attachment = uploader.upload_attachment(path).await?;
      println!("{}  {} ({} bytes)", attachment.url, attachment.mime_type, attachment.size);
    }
    Ok(())
  }

  /// Upload `--attach` files and append their URLs after `existing`.
  async fn attach(
    &self,
    fields: &mut ExpenseFields,
    args: &RecordArgs,
    existing: &[String],
  ) -> Result<()> {
    if args.attachments.is_empty() {
      return Ok(());
    }
    self.ensure_online("upload attachments").await?;

    let uploader = self.uploader()?;
    let mut files = Vec::with_capacity(args.attachments.len());
    for path in &args.attachments {
      files.push(UploadFile::read(path).await?);
    }

    let mut urls = existing.to_vec();
    urls.extend(uploader.upload_all(&files).await?);
    fields.set_attachment_urls(&urls);
    Ok(())
  }

  async fn find(&self, record_id: &str) -> Result<ExpenseRecord> {
    let result = self.sync().await?.get_records(false).await?;
    result
      .data
      .records
      .into_iter()
      .find(|r| r.record_id.as_deref() == Some(record_id))
      .ok_or_else(|| eyre!("Record {} not found", record_id))
  }

  fn uploader(&self) -> Result<BlobUploader> {
    let blob = self
      .config
      .blob
      .as_ref()
      .ok_or_else(|| eyre!("Attachments need a `blob` section in the config file"))?;
    BlobUploader::new(blob)
  }
}

/// Add a hint for the common failure causes of a write.
fn write_error(action: &str, err: SyncError) -> color_eyre::Report {
  if err.is_not_found() {
    eyre!("Failed to {} record: it does not exist or was already deleted", action)
  } else if err.is_connectivity() {
    eyre!("Failed to {} record: check your internet connection ({})", action, err)
  } else {
    eyre!("Failed to {} record: {}", action, err)
  }
}

fn print_user(user: &AuthenticatedUser) {
  match (&user.name, user.read_only) {
    (Some(name), _) => println!("Signed in as {} ({})", name, user.phone),
    (None, true) => println!("Signed in as {} (read-only)", user.phone),
    (None, false) => println!("Signed in as {}", user.phone),
  }
}

fn print_record(record: &ExpenseRecord, uploader: Option<&BlobUploader>) {
  let f = &record.fields;
  let paid = if f.is_paid() { "paid" } else { "" };
  println!(
    "{:<12} {:<6} {:<28} {:>6} {:<8} {:>10.2} {:>12.2}  {}  {}",
    record.record_id.as_deref().unwrap_or("-"),
    f.eid_year.as_deref().unwrap_or_default(),
    f.item.as_deref().unwrap_or_default(),
    f.quantity.unwrap_or(0.0),
    f.unit.as_deref().unwrap_or_default(),
    f.unit_price.unwrap_or(0.0),
    f.cost.unwrap_or(0.0),
    summary::display_category(record),
    paid,
  );
  for attachment in attachments_from_urls(&f.attachment_urls()) {
    match uploader {
      Some(up) => println!("{:>14} {}", "+", up.signed_url(&attachment.url)),
      None => println!("{:>14} {} ({})", "+", attachment.name, attachment.mime_type),
    }
  }
}
