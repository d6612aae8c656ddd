//! Advisory connectivity flag.
//!
//! Being "online" only means a connection looked possible; the next request
//! can still fail, which is why reads keep a fallback to the cache.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, info};
use url::Url;

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

pub trait Connectivity: Send + Sync {
  fn is_online(&self) -> bool;
}

/// Connectivity state shared between the prober and the sync layer.
#[derive(Debug)]
pub struct NetworkStatus {
  online: AtomicBool,
}

impl NetworkStatus {
  pub fn new(online: bool) -> Self {
    Self {
      online: AtomicBool::new(online),
    }
  }

  pub fn set_online(&self) {
    if !self.online.swap(true, Ordering::SeqCst) {
      info!("Connection restored");
    }
  }

  pub fn set_offline(&self) {
    if self.online.swap(false, Ordering::SeqCst) {
      info!("Connection lost");
    }
  }

  /// Try a TCP connection to the host of `url` and record the outcome.
  pub async fn probe(&self, url: &str) -> bool {
    let online = match probe_target(url) {
      Some((host, port)) => {
        let attempt = tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect((host.as_str(), port)));
        matches!(attempt.await, Ok(Ok(_)))
      }
      None => false,
    };

    debug!(url, online, "Connectivity probe finished");
    if online {
      self.set_online();
    } else {
      self.set_offline();
    }
    online
  }
}

impl Default for NetworkStatus {
  fn default() -> Self {
    Self::new(true)
  }
}

impl Connectivity for NetworkStatus {
  fn is_online(&self) -> bool {
    self.online.load(Ordering::SeqCst)
  }
}

fn probe_target(url: &str) -> Option<(String, u16)> {
  let url = Url::parse(url).ok()?;
  let host = url.host_str()?.to_string();
  let port = url.port_or_known_default()?;
  Some((host, port))
}
