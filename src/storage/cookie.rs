//! Cookie-jar backed store.
//!
//! Each line of the jar file is one cookie in `Set-Cookie` form, for example
//! `shapesAuthToken=abc; Path=/; Max-Age=604800; Expires=...; SameSite=Lax; Secure`.
//! Reads build a `Cookie` header from the live cookies and scan it for the
//! requested name. Removal writes an already-expired cookie, which drops it
//! from the jar.
//!
//! Values are percent-encoded on the way in so `;`, whitespace and line
//! breaks in a token cannot split the cookie or the jar line.

use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use std::borrow::Cow;
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use super::TokenStore;
use crate::error::AuthResult;

/// Lifetime of a stored token cookie: seven days.
pub const COOKIE_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 7;

const COOKIE_PATH: &str = "/";
const SAME_SITE: &str = "Lax";
const EXPIRES_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// A single cookie with the attributes the jar keeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub max_age: Option<i64>,
    pub expires: Option<DateTime<Utc>>,
    pub same_site: Option<String>,
    pub secure: bool,
}

impl Cookie {
    /// A root-path, lax, secure-only cookie that lives for seven days from `now`.
    pub fn persistent(name: impl Into<String>, value: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: COOKIE_PATH.to_string(),
            max_age: Some(COOKIE_MAX_AGE_SECS),
            expires: Some(now + Duration::seconds(COOKIE_MAX_AGE_SECS)),
            same_site: Some(SAME_SITE.to_string()),
            secure: true,
        }
    }

    /// An empty cookie that expired at the Unix epoch.
    pub fn expired(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: String::new(),
            path: COOKIE_PATH.to_string(),
            max_age: None,
            expires: Some(DateTime::<Utc>::default()),
            same_site: Some(SAME_SITE.to_string()),
            secure: true,
        }
    }

    /// Whether the cookie is no longer live at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match (self.expires, self.max_age) {
            (Some(expires), _) => expires <= now,
            (None, Some(max_age)) => max_age <= 0,
            (None, None) => false,
        }
    }

    /// Parse a `Set-Cookie` style line. Unknown attributes are ignored.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split(';').map(str::trim);
        let (name, value) = parts.next()?.split_once('=')?;
        if name.is_empty() {
            return None;
        }

        let mut cookie = Self {
            name: name.to_string(),
            value: value.to_string(),
            path: COOKIE_PATH.to_string(),
            max_age: None,
            expires: None,
            same_site: None,
            secure: false,
        };

        for attr in parts {
            let (key, val) = attr.split_once('=').unwrap_or((attr, ""));
            match key.to_ascii_lowercase().as_str() {
                "path" => cookie.path = val.to_string(),
                "max-age" => cookie.max_age = val.parse().ok(),
                "expires" => {
                    cookie.expires = NaiveDateTime::parse_from_str(val, EXPIRES_FORMAT)
                        .ok()
                        .map(|naive| Utc.from_utc_datetime(&naive));
                }
                "samesite" => cookie.same_site = Some(val.to_string()),
                "secure" => cookie.secure = true,
                _ => {}
            }
        }

        Some(cookie)
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}; Path={}", self.name, self.value, self.path)?;
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={}", max_age)?;
        }
        if let Some(expires) = self.expires {
            write!(f, "; Expires={}", expires.format(EXPIRES_FORMAT))?;
        }
        if let Some(ref same_site) = self.same_site {
            write!(f, "; SameSite={}", same_site)?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        Ok(())
    }
}

/// File-backed cookie jar.
#[derive(Debug, Clone)]
pub struct CookieStore {
    path: PathBuf,
}

impl CookieStore {
    /// Create a jar backed by the file at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the default jar path.
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let data_dir =
            dirs::data_local_dir().context("Could not determine local data directory")?;
        Ok(data_dir.join("shapes-auth").join("cookies.txt"))
    }

    /// Every cookie in the jar, expired or not.
    pub fn cookies(&self) -> AuthResult<Vec<Cookie>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&self.path)?;
        Ok(contents.lines().filter_map(Cookie::parse).collect())
    }

    /// The `Cookie` header the jar would send at `now`: `name=value` pairs joined by `"; "`.
    pub fn cookie_header(&self, now: DateTime<Utc>) -> AuthResult<String> {
        let pairs: Vec<String> = self
            .cookies()?
            .into_iter()
            .filter(|c| !c.is_expired(now))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();
        Ok(pairs.join("; "))
    }

    /// Add or replace a cookie, dropping anything that has expired.
    fn write_cookie(&self, cookie: Cookie) -> AuthResult<()> {
        let now = Utc::now();
        let mut jar: Vec<Cookie> = self
            .cookies()?
            .into_iter()
            .filter(|c| !(c.name == cookie.name && c.path == cookie.path))
            .filter(|c| !c.is_expired(now))
            .collect();
        if !cookie.is_expired(now) {
            jar.push(cookie);
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = File::create(&self.path)?;

        #[cfg(unix)]
        {
            let mut perms = file.metadata()?.permissions();
            perms.set_mode(0o600);
            file.set_permissions(perms)?;
        }

        for c in &jar {
            writeln!(file, "{}", c)?;
        }
        Ok(())
    }
}

impl TokenStore for CookieStore {
    fn get(&self, name: &str) -> AuthResult<Option<String>> {
        let header = self.cookie_header(Utc::now())?;
        let prefix = format!("{}=", name);
        Ok(header
            .split("; ")
            .find_map(|row| row.strip_prefix(prefix.as_str()))
            .filter(|value| !value.is_empty())
            .map(|value| {
                urlencoding::decode(value).map_or_else(|_| value.to_string(), Cow::into_owned)
            }))
    }

    fn set(&mut self, name: &str, value: &str) -> AuthResult<()> {
        let encoded = urlencoding::encode(value);
        self.write_cookie(Cookie::persistent(name, encoded, Utc::now()))
    }

    fn remove(&mut self, name: &str) -> AuthResult<()> {
        self.write_cookie(Cookie::expired(name))
    }
}
