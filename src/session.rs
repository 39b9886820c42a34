use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::Result;
use crate::models::TokenPair;
use crate::settings::config_dir;

/// Tokens issued by the API. Wiped from memory on drop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub email: String,
}

impl Session {
    pub fn from_tokens(tokens: TokenPair, email: &str) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            email: email.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_empty()
    }

    pub fn can_refresh(&self) -> bool {
        !self.refresh_token.is_empty()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.access_token.zeroize();
        self.refresh_token.zeroize();
    }
}

pub fn session_path() -> PathBuf {
    config_dir().join("session.json")
}

pub fn load_from(path: &Path) -> Option<Session> {
    let content = std::fs::read_to_string(path).ok()?;
    let session: Session = serde_json::from_str(&content).ok()?;
    if session.is_empty() {
        None
    } else {
        Some(session)
    }
}

/// Open for writing with owner-only access from the moment the file exists.
/// An older file with looser bits is tightened before anything is written.
fn open_private(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let file = options.open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(file)
}

pub fn save_to(path: &Path, session: &Session) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(session)?;
    let mut file = open_private(path)?;
    file.write_all(format!("{json}\n").as_bytes())?;
    Ok(())
}

pub fn clear_at(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

pub fn load() -> Option<Session> {
    load_from(&session_path())
}

pub fn save(session: &Session) -> Result<()> {
    save_to(&session_path(), session)
}

pub fn clear() -> Result<()> {
    clear_at(&session_path())
}
