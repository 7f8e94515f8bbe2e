//! Admin gate: a shared-secret check remembered in local storage.
//!
//! A successful login stores its time under [`SESSION_KEY`]. The CLI treats
//! the login as its session: it lasts [`SESSION_HOURS`] hours across runs,
//! or until `logout`.
//!
//! This keeps casual visitors out of admin commands. It is not a security
//! boundary; the secret is compared in plain text and anyone with access to
//! the local store can set the flag.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use color_eyre::Result;
use tracing::{debug, info, warn};

use crate::local::LocalStore;

pub const SESSION_KEY: &str = "admin_authenticated";

/// How long a login stays valid.
pub const SESSION_HOURS: i64 = 12;

pub struct AdminGate<'a> {
  secret: Option<String>,
  store: &'a dyn LocalStore,
}

impl<'a> AdminGate<'a> {
  /// With no secret configured the gate never opens.
  pub fn new(secret: Option<String>, store: &'a dyn LocalStore) -> Self {
    Self { secret, store }
  }

  /// Compare `attempt` with the secret and remember a match.
  pub fn login(&self, attempt: &str) -> Result<bool> {
    let Some(secret) = &self.secret else {
      warn!("admin login attempted but no admin password is configured");
      return Ok(false);
    };

    if attempt != secret {
      warn!("admin login failed");
      return Ok(false);
    }

    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    self.store.set(SESSION_KEY, &now)?;
    info!("admin logged in");
    Ok(true)
  }

  pub fn logout(&self) -> Result<()> {
    self.store.remove(SESSION_KEY)
  }

  pub fn is_authenticated(&self) -> bool {
    self.is_authenticated_at(Utc::now())
  }

  fn is_authenticated_at(&self, now: DateTime<Utc>) -> bool {
    let Ok(Some(raw)) = self.store.get(SESSION_KEY) else {
      return false;
    };
    match DateTime::parse_from_rfc3339(raw.trim()) {
      Ok(logged_in) => now - logged_in.with_timezone(&Utc) <= Duration::hours(SESSION_HOURS),
      Err(_) => {
        debug!("ignoring unreadable admin session flag");
        false
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::local::SqliteStore;

  #[test]
  fn test_login_logout() {
    let store = SqliteStore::open_in_memory().unwrap();
    let gate = AdminGate::new(Some("s3cret".into()), &store);
    assert!(!gate.is_authenticated());

    assert!(!gate.login("guess").unwrap());
    assert!(!gate.is_authenticated());

    assert!(gate.login("s3cret").unwrap());
    assert!(gate.is_authenticated());

    gate.logout().unwrap();
    assert!(!gate.is_authenticated());
  }

  #[test]
  fn test_no_secret_never_opens() {
    let store = SqliteStore::open_in_memory().unwrap();
    let gate = AdminGate::new(None, &store);
    assert!(!gate.login("").unwrap());
    assert!(!gate.is_authenticated());
  }

  #[test]
  fn test_session_expires() {
    let store = SqliteStore::open_in_memory().unwrap();
    let gate = AdminGate::new(Some("s3cret".into()), &store);
    assert!(gate.login("s3cret").unwrap());

    let later = Utc::now() + Duration::hours(SESSION_HOURS) - Duration::minutes(1);
    assert!(gate.is_authenticated_at(later));
    let expired = Utc::now() + Duration::hours(SESSION_HOURS) + Duration::minutes(1);
    assert!(!gate.is_authenticated_at(expired));
  }

  #[test]
  fn test_unreadable_flag_is_logged_out() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.set(SESSION_KEY, "true").unwrap();
    let gate = AdminGate::new(Some("s3cret".into()), &store);
    assert!(!gate.is_authenticated());
  }
}
