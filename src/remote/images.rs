//! Best-effort cleanup of product images hosted by the storefront itself.

use serde_json::json;
use tracing::{debug, warn};
use url::Url;

/// Receives image references that should be removed from storage.
///
/// Implementations must not block and must not fail the caller.
pub trait ImageRemover: Send + Sync {
  fn remove(&self, path: &str);
}

/// True for paths the storefront serves itself, as opposed to remote URLs
/// or inline `data:` images.
pub fn is_locally_hosted(image_url: &str) -> bool {
  let image_url = image_url.trim();
  if image_url.is_empty() {
    return false;
  }
  let lower = image_url.to_ascii_lowercase();
  !(lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("data:"))
}

/// Posts `{"path": ...}` to a deletion endpoint from a background task.
#[derive(Clone)]
pub struct HttpImageRemover {
  http: reqwest::Client,
  endpoint: Url,
}

impl HttpImageRemover {
  pub fn new(endpoint: Url) -> Self {
    Self {
      http: reqwest::Client::new(),
      endpoint,
    }
  }
}

impl ImageRemover for HttpImageRemover {
  fn remove(&self, path: &str) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
      warn!(path, "no async runtime, skipping image cleanup");
      return;
    };

    let http = self.http.clone();
    let endpoint = self.endpoint.clone();
    let path = path.to_string();

    handle.spawn(async move {
      let result = http
        .post(endpoint)
        .json(&json!({ "path": path }))
        .send()
        .await
        .and_then(|r| r.error_for_status());

      match result {
        Ok(_) => debug!(path, "image removed"),
        Err(e) => warn!(path, error = %e, "failed to remove image"),
      }
    });
  }
}
