//! Compose App Registry: the list of docker-compose projects the dashboard
//! knows about, persisted as one JSON document.
//!
//! Every mutation rewrites the whole file (temp file, then rename) while
//! holding the registry lock, and only then updates the in-memory list. A
//! failed write leaves both untouched.

use crate::command::split_command_line;
use crate::error::{RegistryError, Result, ValidationError};
use crate::ops::validate::{require, validate_compose_path};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// Arguments used for `docker-compose up` when an app names none.
pub const DEFAULT_UP_ARGS: &str = "up -d --pull=always";

/// A registered compose project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeApp {
    pub id: Uuid,
    pub name: String,
    pub path: String,
    /// Argument string appended after `docker-compose -f <file>`.
    #[serde(rename = "upCommand", alias = "upCommandArgs", default = "default_up_args")]
    pub up_args: String,
}

fn default_up_args() -> String {
    DEFAULT_UP_ARGS.to_string()
}

impl ComposeApp {
    /// `up_args` split into words.
    pub fn up_argv(&self) -> std::result::Result<Vec<String>, ValidationError> {
        parse_up_args(&self.up_args)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed(ComposeApp),
    NotFound,
}

pub fn parse_up_args(raw: &str) -> std::result::Result<Vec<String>, ValidationError> {
    let argv = split_command_line(raw).map_err(|reason| ValidationError::InvalidArguments {
        field: "upCommand".to_string(),
        reason,
    })?;
    if argv.is_empty() {
        return Err(ValidationError::InvalidArguments {
            field: "upCommand".to_string(),
            reason: "no arguments".to_string(),
        });
    }
    Ok(argv)
}

fn normalize_up_args(raw: Option<&str>) -> std::result::Result<Option<String>, ValidationError> {
    match raw.map(str::trim) {
        Some(args) if !args.is_empty() => {
            parse_up_args(args)?;
            Ok(Some(args.to_string()))
        }
        _ => Ok(None),
    }
}

pub struct ComposeRegistry {
    path: PathBuf,
    apps: Mutex<Vec<ComposeApp>>,
}

impl ComposeRegistry {
    /// Load the registry, creating the directory and an empty `[]` document
    /// if needed. An empty file reads as no apps; anything else that is not
    /// a JSON array of apps is an error.
    pub async fn open(path: impl Into<PathBuf>) -> std::result::Result<Self, RegistryError> {
        let path = path.into();
        let shown = path.display().to_string();

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| RegistryError::Write {
                    path: dir.display().to_string(),
                    reason: e.to_string(),
                })?;
        }

        let apps = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => Vec::new(),
            Ok(content) => serde_json::from_str(&content).map_err(|source| RegistryError::Corrupt {
                path: shown.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("📝 Creating empty compose registry at {}", shown);
                write_document(&path, &[])?;
                Vec::new()
            }
            Err(source) => {
                return Err(RegistryError::Read {
                    path: shown,
                    source,
                });
            }
        };

        info!("📚 Loaded {} compose app(s) from {}", apps.len(), shown);
        Ok(Self {
            path,
            apps: Mutex::new(apps),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn list(&self) -> Vec<ComposeApp> {
        self.apps.lock().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<ComposeApp> {
        let id = Uuid::parse_str(id).ok()?;
        self.apps.lock().await.iter().find(|a| a.id == id).cloned()
    }

    /// The app registered for exactly this compose file path.
    pub async fn find_by_path(&self, path: &str) -> Option<ComposeApp> {
        self.apps
            .lock()
            .await
            .iter()
            .find(|a| a.path == path)
            .cloned()
    }

    pub async fn add(&self, name: &str, path: &str, up_args: Option<&str>) -> Result<ComposeApp> {
        let name = require("name", Some(name))?;
        let path = validate_compose_path(path)?;
        let up_args = normalize_up_args(up_args)?.unwrap_or_else(default_up_args);

        let app = ComposeApp {
            id: Uuid::new_v4(),
            name: name.to_string(),
            path: path.to_string(),
            up_args,
        };

        let mut apps = self.apps.lock().await;
        let mut next = apps.clone();
        next.push(app.clone());
        self.persist(&next).await?;
        *apps = next;

        info!("➕ Registered compose app {} ({}) at {}", app.name, app.id, app.path);
        Ok(app)
    }

    /// Replace name, path and (if given) arguments. `None` when no app has
    /// this id.
    pub async fn update(
        &self,
        id: &str,
        name: &str,
        path: &str,
        up_args: Option<&str>,
    ) -> Result<Option<ComposeApp>> {
        let name = require("name", Some(name))?;
        let path = validate_compose_path(path)?;
        let up_args = normalize_up_args(up_args)?;

        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(None);
        };

        let mut apps = self.apps.lock().await;
        let Some(index) = apps.iter().position(|a| a.id == id) else {
            return Ok(None);
        };

        let mut next = apps.clone();
        let app = &mut next[index];
        app.name = name.to_string();
        app.path = path.to_string();
        if let Some(args) = up_args {
            app.up_args = args;
        }
        let updated = app.clone();

        self.persist(&next).await?;
        *apps = next;

        info!("✏️  Updated compose app {} ({})", updated.name, updated.id);
        Ok(Some(updated))
    }

    pub async fn remove(&self, id: &str) -> Result<RemoveOutcome> {
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(RemoveOutcome::NotFound);
        };

        let mut apps = self.apps.lock().await;
        let Some(index) = apps.iter().position(|a| a.id == id) else {
            return Ok(RemoveOutcome::NotFound);
        };

        let mut next = apps.clone();
        let removed = next.remove(index);
        self.persist(&next).await?;
        *apps = next;

        info!("➖ Removed compose app {} ({})", removed.name, removed.id);
        Ok(RemoveOutcome::Removed(removed))
    }

    async fn persist(&self, apps: &[ComposeApp]) -> std::result::Result<(), RegistryError> {
        let path = self.path.clone();
        let apps = apps.to_vec();
        tokio::task::spawn_blocking(move || write_document(&path, &apps))
            .await
            .map_err(|e| RegistryError::Write {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?
    }
}

/// Write the full document next to its destination, then rename over it.
fn write_document(path: &Path, apps: &[ComposeApp]) -> std::result::Result<(), RegistryError> {
    let write_err = |reason: String| RegistryError::Write {
        path: path.display().to_string(),
        reason,
    };

    let data = serde_json::to_vec_pretty(apps).map_err(|e| write_err(e.to_string()))?;
    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| write_err(e.to_string()))?;
    tmp.write_all(&data).map_err(|e| write_err(e.to_string()))?;
    tmp.write_all(b"\n").map_err(|e| write_err(e.to_string()))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| write_err(e.to_string()))?;
    tmp.persist(path).map_err(|e| write_err(e.error.to_string()))?;

    debug!("Wrote {} compose app(s) to {}", apps.len(), path.display());
    Ok(())
}
