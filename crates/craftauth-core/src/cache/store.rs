use std::io;
use std::path::{Path, PathBuf};

use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Last-login file name inside the Minecraft directory
const LAST_LOGIN_FILE: &str = "lastLogin.json";

/// Scratch file used for atomic replacement
const LAST_LOGIN_TMP_FILE: &str = "lastLogin.json.tmp";

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("No saved login at {}", .0.display())]
    NotFound(PathBuf),

    #[error("Saved login at {} is malformed: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PersistenceError {
    fn io(path: &Path, source: io::Error) -> Self {
        PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Durable record of the last successful session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "StoredLogin")]
pub struct PersistedLogin {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub display_name: String,
    pub access_token: String,
    pub client_token: String,
    pub profile_id: String,
}

/// On-disk shape, accepting the older `name`/`id` keys.
/// The camelCase key wins when a record carries both.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredLogin {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    access_token: String,
    client_token: String,
    #[serde(default)]
    profile_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

impl TryFrom<StoredLogin> for PersistedLogin {
    type Error = String;

    fn try_from(stored: StoredLogin) -> Result<Self, Self::Error> {
        Ok(Self {
            username: stored.username,
            display_name: stored
                .display_name
                .or(stored.name)
                .ok_or("missing field `displayName`")?,
            access_token: stored.access_token,
            client_token: stored.client_token,
            profile_id: stored
                .profile_id
                .or(stored.id)
                .ok_or("missing field `profileId`")?,
        })
    }
}

pub struct SessionStore {
    minecraft_dir: PathBuf,
}

impl SessionStore {
    pub fn new(minecraft_dir: impl Into<PathBuf>) -> Self {
        Self {
            minecraft_dir: minecraft_dir.into(),
        }
    }

    /// Full path of the last-login file
    pub fn path(&self) -> PathBuf {
        self.minecraft_dir.join(LAST_LOGIN_FILE)
    }

    pub fn minecraft_dir(&self) -> &Path {
        &self.minecraft_dir
    }

    /// Write the record, replacing any previous one.
    ///
    /// The JSON goes to a scratch file first and is renamed into place, so a
    /// reader sees either the old record or the new one.
    pub fn save(&self, login: &PersistedLogin) -> Result<(), PersistenceError> {
        std::fs::create_dir_all(&self.minecraft_dir)
            .map_err(|e| PersistenceError::io(&self.minecraft_dir, e))?;

        let path = self.path();
        let tmp = self.minecraft_dir.join(LAST_LOGIN_TMP_FILE);

        let contents = serde_json::to_string_pretty(login).map_err(|e| PersistenceError::Malformed {
            path: path.clone(),
            source: e,
        })?;

        if let Err(e) = std::fs::write(&tmp, contents) {
            let _ = std::fs::remove_file(&tmp);
            return Err(PersistenceError::io(&tmp, e));
        }
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(PersistenceError::io(&path, e));
        }

        debug!(path = %path.display(), "Saved last login");
        Ok(())
    }

    /// Read the record. Never modifies the file.
    pub fn read(&self) -> Result<PersistedLogin, PersistenceError> {
        let path = self.path();
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(PersistenceError::NotFound(path));
            }
            Err(e) => return Err(PersistenceError::io(&path, e)),
        };

        let value: serde_json::Value = match serde_json::from_str(&contents) {
            Ok(value) => value,
            Err(e) => return Err(PersistenceError::Malformed { path, source: e }),
        };
        // Derived structs would also accept a JSON array in field order.
        if !value.is_object() {
            return Err(PersistenceError::Malformed {
                path,
                source: serde_json::Error::custom("expected a JSON object"),
            });
        }

        serde_json::from_value(value).map_err(|e| PersistenceError::Malformed { path, source: e })
    }

    /// Remove the record. Returns `false` when there was nothing to remove.
    pub fn delete(&self) -> Result<bool, PersistenceError> {
        let path = self.path();
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "Deleted last login");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No last login to delete");
                Ok(false)
            }
            Err(e) => Err(PersistenceError::io(&path, e)),
        }
    }

    pub fn exists(&self) -> bool {
        self.path().exists()
    }
}

// ============================================================================
// Tests
// ============================================================================
