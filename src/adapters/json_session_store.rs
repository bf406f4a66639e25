//! Session cookies persisted as a JSON file.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::domain::error::TradeDeskError;
use crate::domain::session::SessionCookies;
use crate::ports::session_port::SessionStore;

pub struct JsonSessionStore {
    path: PathBuf,
}

impl JsonSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for JsonSessionStore {
    /// A missing or unreadable file is treated as "no session" so the
    /// caller logs in again.
    fn load(&self) -> Result<Option<SessionCookies>, TradeDeskError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "no stored session");
                return Ok(None);
            }
        };
        match SessionCookies::from_json(&content) {
            Ok(session) if !session.is_empty() => Ok(Some(session)),
            Ok(_) => Ok(None),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable session file");
                Ok(None)
            }
        }
    }

    fn save(&self, session: &SessionCookies) -> Result<(), TradeDeskError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| TradeDeskError::Session {
                reason: format!("cannot create {}: {e}", parent.display()),
            })?;
        }
        fs::write(&self.path, session.to_json()?).map_err(|e| TradeDeskError::Session {
            reason: format!("cannot write {}: {e}", self.path.display()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::SessionCookie;
    use tempfile::TempDir;

    #[test]
    fn missing_file_means_no_session() {
        let store = JsonSessionStore::new("/nonexistent/auth_data/kite.json");
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = JsonSessionStore::new(dir.path().join("auth_data").join("kite.json"));
        let session = SessionCookies::new(vec![
            SessionCookie::new("public_token", "abc"),
            SessionCookie::new("kf_session", "xyz"),
        ]);
        store.save(&session).unwrap();
        assert_eq!(store.load().unwrap(), Some(session));
    }

    #[test]
    fn corrupt_or_empty_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sentinel.json");
        fs::write(&path, "{{ not json").unwrap();
        assert_eq!(JsonSessionStore::new(&path).load().unwrap(), None);
        fs::write(&path, "[]").unwrap();
        assert_eq!(JsonSessionStore::new(&path).load().unwrap(), None);
    }

    #[test]
    fn browser_dumps_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kite.json");
        fs::write(
            &path,
            r#"[{"name":"public_token","value":"t","size":17,"httpOnly":false,"session":true,"sameSite":"Lax"}]"#,
        )
        .unwrap();
        let session = JsonSessionStore::new(&path).load().unwrap().unwrap();
        assert_eq!(session.csrf_token("public_token"), Some("t"));
    }
}
