//! Token persistence.
//!
//! The acquired bearer token can be kept in one of two local backends: a
//! durable key-value file, or a cookie jar whose cookies carry a path,
//! expiry and transmission policy. Loading checks the durable store first.

mod cookie;
mod durable;

pub use cookie::{Cookie, CookieStore, COOKIE_MAX_AGE_SECS};
pub use durable::DurableStore;

use std::fmt;

use crate::error::AuthResult;

/// Fixed name the token is stored under in both backends.
pub const TOKEN_KEY: &str = "shapesAuthToken";

/// Get/set/remove contract shared by the storage backends.
pub trait TokenStore: fmt::Debug + Send {
    /// Read the value stored under `name`, if any.
    fn get(&self, name: &str) -> AuthResult<Option<String>>;

    /// Store `value` under `name`, replacing any previous value.
    fn set(&mut self, name: &str, value: &str) -> AuthResult<()>;

    /// Remove the value stored under `name`. Removing a missing value is not an error.
    fn remove(&mut self, name: &str) -> AuthResult<()>;
}

/// Which backend a store action targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// Durable key-value file.
    Durable,
    /// Cookie jar.
    Cookie,
}

impl StorageKind {
    /// Human-readable backend name.
    pub const fn display_name(&self) -> &'static str {
        match self {
            StorageKind::Durable => "Durable Store",
            StorageKind::Cookie => "Cookie",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A token found by [`TokenPersistence::load`], with the backend it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedToken {
    pub token: String,
    pub source: StorageKind,
}

/// Both storage backends behind one facade.
#[derive(Debug)]
pub struct TokenPersistence {
    durable: Box<dyn TokenStore>,
    cookie: Box<dyn TokenStore>,
}

impl TokenPersistence {
    /// Combine a durable backend and a cookie backend.
    pub fn new(durable: Box<dyn TokenStore>, cookie: Box<dyn TokenStore>) -> Self {
        Self { durable, cookie }
    }

    /// Write the token to exactly the selected backend.
    pub fn store(&mut self, kind: StorageKind, token: &str) -> AuthResult<()> {
        tracing::debug!(backend = %kind, "storing auth token");
        match kind {
            StorageKind::Durable => self.durable.set(TOKEN_KEY, token),
            StorageKind::Cookie => self.cookie.set(TOKEN_KEY, token),
        }
    }

    /// Find a stored token. The durable store wins when both hold one.
    ///
    /// An unreadable durable store is logged and treated as empty, so a token
    /// in the cookie jar is still found.
    pub fn load(&self) -> AuthResult<Option<LoadedToken>> {
        let durable = self.durable.get(TOKEN_KEY).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "durable store unreadable, falling back to cookies");
            None
        });
        if let Some(token) = non_empty(durable) {
            return Ok(Some(LoadedToken {
                token,
                source: StorageKind::Durable,
            }));
        }

        Ok(non_empty(self.cookie.get(TOKEN_KEY)?).map(|token| LoadedToken {
            token,
            source: StorageKind::Cookie,
        }))
    }

    /// Remove the token from both backends.
    ///
    /// Both removals are attempted even if the first one fails; the first
    /// failure is returned.
    pub fn clear(&mut self) -> AuthResult<()> {
        let durable = self.durable.remove(TOKEN_KEY);
        let cookie = self.cookie.remove(TOKEN_KEY);
        durable.and(cookie)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn persistence(dir: &TempDir) -> TokenPersistence {
        TokenPersistence::new(
            Box::new(DurableStore::new(dir.path().join("storage.json"))),
            Box::new(CookieStore::new(dir.path().join("cookies.txt"))),
        )
    }

    #[test]
    fn test_load_empty() {
        let dir = TempDir::new().unwrap();
        assert_eq!(persistence(&dir).load().unwrap(), None);
    }

    #[test]
    fn test_durable_takes_precedence() {
        let dir = TempDir::new().unwrap();
        let mut p = persistence(&dir);
        p.store(StorageKind::Cookie, "from-cookie").unwrap();
        p.store(StorageKind::Durable, "from-durable").unwrap();

        let loaded = p.load().unwrap().unwrap();
        assert_eq!(loaded.token, "from-durable");
        assert_eq!(loaded.source, StorageKind::Durable);
    }

    #[test]
    fn test_cookie_used_when_durable_empty() {
        let dir = TempDir::new().unwrap();
        let mut p = persistence(&dir);
        p.store(StorageKind::Cookie, "from-cookie").unwrap();

        let loaded = p.load().unwrap().unwrap();
        assert_eq!(loaded.token, "from-cookie");
        assert_eq!(loaded.source, StorageKind::Cookie);
    }

    #[test]
    fn test_store_writes_only_selected_backend() {
        let dir = TempDir::new().unwrap();
        let mut p = persistence(&dir);
        p.store(StorageKind::Durable, "tok").unwrap();

        let cookie = CookieStore::new(dir.path().join("cookies.txt"));
        assert_eq!(cookie.get(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut p = persistence(&dir);
        p.store(StorageKind::Durable, "a").unwrap();
        p.store(StorageKind::Cookie, "b").unwrap();

        p.clear().unwrap();
        assert_eq!(p.load().unwrap(), None);
        p.clear().unwrap();
        assert_eq!(p.load().unwrap(), None);
    }

    #[test]
    fn test_tokens_with_separators_roundtrip() {
        let tokens = ["a; b", "a;b", "trail ", " lead", "x\ny", "p=q", "100%", "tab\tbed"];
        for kind in [StorageKind::Durable, StorageKind::Cookie] {
            for token in tokens {
                let dir = TempDir::new().unwrap();
                let mut p = persistence(&dir);
                p.store(kind, token).unwrap();

                let loaded = p.load().unwrap().unwrap();
                assert_eq!(loaded.token, token, "{} lost data", kind);
                assert_eq!(loaded.source, kind);
            }
        }
    }

    #[test]
    fn test_corrupt_durable_falls_back_to_cookie() {
        let dir = TempDir::new().unwrap();
        let mut p = persistence(&dir);
        p.store(StorageKind::Cookie, "from-cookie").unwrap();
        std::fs::write(dir.path().join("storage.json"), "not json").unwrap();

        let loaded = p.load().unwrap().unwrap();
        assert_eq!(loaded.token, "from-cookie");
        assert_eq!(loaded.source, StorageKind::Cookie);
    }

    #[test]
    fn test_clear_recovers_corrupt_durable() {
        let dir = TempDir::new().unwrap();
        let mut p = persistence(&dir);
        p.store(StorageKind::Cookie, "from-cookie").unwrap();
        std::fs::write(dir.path().join("storage.json"), r#"{"shapesAuthToken": 5}"#).unwrap();

        p.clear().unwrap();
        assert_eq!(p.load().unwrap(), None);
        p.clear().unwrap();
        assert_eq!(p.load().unwrap(), None);

        let durable = DurableStore::new(dir.path().join("storage.json"));
        assert_eq!(durable.get(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_storage_kind_display() {
        assert_eq!(StorageKind::Durable.to_string(), "Durable Store");
        assert_eq!(StorageKind::Cookie.to_string(), "Cookie");
    }
}
