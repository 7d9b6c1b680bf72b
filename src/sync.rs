use crate::model::Board;
use crate::storage;
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

const CONFIG_FILE: &str = "sync.yml";

pub const STATUS_SYNCED: &str = "Synced with cloud";
pub const STATUS_ERROR: &str = "Sync error";
pub const STATUS_OFFLINE: &str = "Not logged in";

/// The authenticated principal: where the remote store lives and who we are.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub endpoint: String,
    pub user_id: String,
    pub token: String,
}

#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error("not logged in")]
    NotConfigured,
    #[error("authentication rejected ({0})")]
    Auth(StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub fn config_path() -> Result<PathBuf> {
    Ok(storage::config_dir()?.join(CONFIG_FILE))
}

pub fn load_config() -> Result<Option<SyncConfig>> {
    read_config(&config_path()?)
}

pub fn save_config(config: &SyncConfig) -> Result<()> {
    write_config(&config_path()?, config)
}

pub fn clear_config() -> Result<bool> {
    let path = config_path()?;
    if path.exists() {
        fs::remove_file(&path).with_context(|| format!("removing {:?}", path))?;
        Ok(true)
    } else {
        Ok(false)
    }
}

fn read_config(path: &Path) -> Result<Option<SyncConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let config = serde_yaml::from_str(&data).context("parsing sync config")?;
    Ok(Some(config))
}

fn write_config(path: &Path, config: &SyncConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = serde_yaml::to_string(config).context("serializing sync config")?;
    fs::write(path, serialized).with_context(|| format!("writing {:?}", path))?;
    Ok(())
}

/// Client for the per-user board document on the remote store.
pub struct RemoteClient {
    http: Client,
    config: SyncConfig,
}

impl RemoteClient {
    pub fn new(config: SyncConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("building http client")?;
        Ok(RemoteClient { http, config })
    }

    pub fn user_id(&self) -> &str {
        &self.config.user_id
    }

    fn document_url(&self) -> String {
        document_url(&self.config.endpoint, &self.config.user_id)
    }

    /// Fetch the remote snapshot. `None` means the document does not exist yet.
    pub fn fetch(&self) -> Result<Option<Board>, SyncError> {
        let url = self.document_url();
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.config.token)
            .send()?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(SyncError::Auth(response.status()))
            }
            _ => {
                let board = response.error_for_status()?.json::<Board>()?;
                debug!(%url, "fetched remote snapshot");
                Ok(Some(board))
            }
        }
    }

    /// Overwrite the remote document with the whole board.
    pub fn push(&self, board: &Board) -> Result<(), SyncError> {
        let url = self.document_url();
        let response = self
            .http
            .put(&url)
            .bearer_auth(&self.config.token)
            .json(board)
            .send()?;
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(SyncError::Auth(response.status()))
            }
            _ => {
                response.error_for_status()?;
                debug!(%url, "pushed snapshot");
                Ok(())
            }
        }
    }
}

fn document_url(endpoint: &str, user_id: &str) -> String {
    format!("{}/users/{}/board", endpoint.trim_end_matches('/'), user_id)
}

/// Whole-snapshot comparison by serialized equality, as the replace policy
/// requires. A differing remote snapshot replaces the local board wholesale.
pub fn snapshots_differ(local: &Board, remote: &Board) -> bool {
    serde_json::to_string(local).ok() != serde_json::to_string(remote).ok()
}

pub enum SyncEvent {
    /// Full remote snapshot delivered by the subscription.
    Snapshot(Board),
    /// The remote document does not exist yet; local state should be pushed up.
    RemoteEmpty,
    /// A poll failed; carries the status text to surface.
    Failed(String),
}

pub struct SyncSubscription {
    rx: Receiver<SyncEvent>,
}

impl SyncSubscription {
    pub fn try_recv(&self) -> Option<SyncEvent> {
        self.rx.try_recv().ok()
    }
}

/// Start the polling subscription delivering full remote snapshots. The
/// thread exits when the subscription is dropped.
pub fn subscribe(config: SyncConfig, interval: Duration) -> Result<SyncSubscription> {
    let client = RemoteClient::new(config)?;
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || poll_loop(client, tx, interval));
    Ok(SyncSubscription { rx })
}

fn poll_loop(client: RemoteClient, tx: Sender<SyncEvent>, interval: Duration) {
    loop {
        let event = match client.fetch() {
            Ok(Some(board)) => SyncEvent::Snapshot(board),
            Ok(None) => SyncEvent::RemoteEmpty,
            Err(err) => {
                warn!(user = client.user_id(), error = %err, "remote poll failed");
                let status = match err {
                    SyncError::Auth(code) => format!("Sign-in rejected ({})", code),
                    _ => STATUS_ERROR.to_string(),
                };
                SyncEvent::Failed(status)
            }
        };
        if tx.send(event).is_err() {
            break;
        }
        thread::sleep(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_url_joins_endpoint_and_user() {
        assert_eq!(
            document_url("https://store.example.com", "u1"),
            "https://store.example.com/users/u1/board"
        );
        assert_eq!(
            document_url("https://store.example.com/", "u1"),
            "https://store.example.com/users/u1/board"
        );
    }

    #[test]
    fn identical_snapshots_do_not_differ() {
        let mut local = Board::default();
        local.add_task("Main", "pay rent", None).unwrap();
        let remote = local.clone();
        assert!(!snapshots_differ(&local, &remote));
    }

    #[test]
    fn any_field_change_makes_snapshots_differ() {
        let mut local = Board::default();
        local.add_task("Main", "pay rent", None).unwrap();

        let mut remote = local.clone();
        remote.toggle_task("Main", 1).unwrap();
        assert!(snapshots_differ(&local, &remote));

        let mut remote = local.clone();
        remote.add_list("Work").unwrap();
        assert!(snapshots_differ(&local, &remote));
    }

    #[test]
    fn config_round_trips_through_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        assert!(read_config(&path).unwrap().is_none());

        let config = SyncConfig {
            endpoint: "https://store.example.com".into(),
            user_id: "u1".into(),
            token: "secret".into(),
        };
        write_config(&path, &config).unwrap();
        assert_eq!(read_config(&path).unwrap(), Some(config));
    }
}
