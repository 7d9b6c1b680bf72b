use crate::model::{Board, TaskId};
use crate::storage::{self, BoardLocation};
use crate::sync::{self, RemoteClient, SyncError};
use anyhow::Result;
use chrono::NaiveDate;
use std::env;
use tracing::{info, warn};

/// Every mutation of the board goes through [`AppState::apply`], which
/// validates, mutates, persists locally, and forwards the snapshot to the
/// remote store. The UI and the CLI both funnel through it.
pub enum Update {
    AddTask {
        list: String,
        text: String,
        due: Option<NaiveDate>,
    },
    EditTaskText {
        list: String,
        id: TaskId,
        text: String,
    },
    SetDue {
        list: String,
        id: TaskId,
        due: Option<NaiveDate>,
    },
    ToggleTask {
        list: String,
        id: TaskId,
    },
    DeleteTask {
        list: String,
        id: TaskId,
    },
    AddList {
        name: String,
    },
    RenameList {
        old: String,
        new: String,
    },
    DeleteList {
        name: String,
    },
    SelectList {
        name: String,
    },
    /// Wholesale replacement by a remote snapshot (last-write-wins).
    ReplaceBoard(Board),
}

pub struct AppState {
    pub board: Board,
    pub current_list: String,
    pub location: BoardLocation,
    pub sync_status: String,
    remote: Option<RemoteClient>,
}

impl AppState {
    pub fn new(
        board: Board,
        current_list: String,
        location: BoardLocation,
        remote: Option<RemoteClient>,
    ) -> Self {
        let sync_status = if remote.is_some() {
            sync::STATUS_SYNCED.to_string()
        } else {
            sync::STATUS_OFFLINE.to_string()
        };
        AppState {
            board,
            current_list,
            location,
            sync_status,
            remote,
        }
    }

    /// Load the board, the current-list pointer, and the sync principal.
    pub fn load() -> Result<Self> {
        let cwd = env::current_dir()?;
        let location = storage::locate_board(&cwd)?;
        let board = storage::load_board(&location)?;
        let current_list = storage::load_current_list(&location, &board);
        let remote = match sync::load_config()? {
            Some(config) => Some(RemoteClient::new(config)?),
            None => None,
        };
        Ok(AppState::new(board, current_list, location, remote))
    }

    pub fn is_synced(&self) -> bool {
        self.remote.is_some()
    }

    pub fn apply(&mut self, update: Update) -> Result<String> {
        let message = match update {
            Update::AddTask { list, text, due } => {
                let id = self.board.add_task(&list, &text, due)?;
                format!("Added task {} to {}", id, list)
            }
            Update::EditTaskText { list, id, text } => {
                self.board.edit_task_text(&list, id, &text)?;
                format!("Updated task {}", id)
            }
            Update::SetDue { list, id, due } => {
                self.board.set_due(&list, id, due)?;
                match due {
                    Some(date) => format!("Task {} due {}", id, date),
                    None => format!("Cleared due date on task {}", id),
                }
            }
            Update::ToggleTask { list, id } => {
                let completed = self.board.toggle_task(&list, id)?;
                if completed {
                    format!("Completed task {}", id)
                } else {
                    format!("Reopened task {}", id)
                }
            }
            Update::DeleteTask { list, id } => {
                self.board.delete_task(&list, id)?;
                format!("Deleted task {}", id)
            }
            Update::AddList { name } => {
                self.board.add_list(&name)?;
                self.current_list = name.trim().to_string();
                format!("Added list {}", self.current_list)
            }
            Update::RenameList { old, new } => {
                self.board.rename_list(&old, &new)?;
                if self.current_list == old {
                    self.current_list = new.trim().to_string();
                }
                format!("Renamed {} to {}", old, new.trim())
            }
            Update::DeleteList { name } => {
                self.board.delete_list(&name)?;
                if self.current_list == name {
                    self.current_list = self
                        .board
                        .first_list_name()
                        .unwrap_or("Main")
                        .to_string();
                }
                format!("Deleted list {}", name)
            }
            Update::SelectList { name } => {
                if self.board.find_list(&name).is_none() {
                    return Err(crate::model::BoardError::ListNotFound(name).into());
                }
                self.current_list = name;
                self.persist_local()?;
                return Ok(format!("Now using {}", self.current_list));
            }
            Update::ReplaceBoard(board) => {
                self.board = board;
                if self.board.find_list(&self.current_list).is_none() {
                    self.current_list = self
                        .board
                        .first_list_name()
                        .unwrap_or("Main")
                        .to_string();
                }
                // A snapshot that arrived from the remote is not pushed back.
                self.persist_local()?;
                return Ok("Updated from cloud".to_string());
            }
        };
        self.persist_local()?;
        self.push_snapshot();
        Ok(message)
    }

    fn persist_local(&self) -> Result<()> {
        storage::save_board(&self.location, &self.board)?;
        storage::save_current_list(&self.location, &self.current_list)?;
        Ok(())
    }

    /// Best-effort forward of the whole snapshot to the remote store. Local
    /// persistence has already succeeded; a remote failure only updates the
    /// status string.
    pub fn push_snapshot(&mut self) {
        let Some(remote) = &self.remote else {
            self.sync_status = sync::STATUS_OFFLINE.to_string();
            return;
        };
        match remote.push(&self.board) {
            Ok(()) => {
                info!(user = remote.user_id(), "snapshot pushed");
                self.sync_status = sync::STATUS_SYNCED.to_string();
            }
            Err(SyncError::Auth(code)) => {
                warn!(user = remote.user_id(), %code, "push rejected");
                self.sync_status = format!("Sign-in rejected ({})", code);
            }
            Err(err) => {
                warn!(user = remote.user_id(), error = %err, "push failed");
                self.sync_status = sync::STATUS_ERROR.to_string();
            }
        }
    }

    /// One-shot reconciliation with the remote document: a differing remote
    /// snapshot replaces the local board wholesale; an absent document gets
    /// the local snapshot pushed up.
    pub fn pull_snapshot(&mut self) -> Result<String> {
        let Some(remote) = &self.remote else {
            self.sync_status = sync::STATUS_OFFLINE.to_string();
            return Err(SyncError::NotConfigured.into());
        };
        match remote.fetch() {
            Ok(Some(snapshot)) => {
                self.sync_status = sync::STATUS_SYNCED.to_string();
                if sync::snapshots_differ(&self.board, &snapshot) {
                    self.apply(Update::ReplaceBoard(snapshot))
                } else {
                    Ok("Already up to date".to_string())
                }
            }
            Ok(None) => {
                self.push_snapshot();
                Ok("Remote was empty; pushed local board".to_string())
            }
            Err(err) => {
                self.sync_status = match &err {
                    SyncError::Auth(code) => format!("Sign-in rejected ({})", code),
                    _ => sync::STATUS_ERROR.to_string(),
                };
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BoardError;
    use crate::storage::{load_board, BoardScope};
    use std::path::Path;

    fn temp_state(dir: &Path) -> AppState {
        let location = BoardLocation {
            path: dir.join("board.yml"),
            scope: BoardScope::Project,
        };
        AppState::new(Board::default(), "Main".into(), location, None)
    }

    #[test]
    fn apply_persists_every_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = temp_state(dir.path());

        state
            .apply(Update::AddTask {
                list: "Main".into(),
                text: "buy milk".into(),
                due: None,
            })
            .unwrap();

        let on_disk = load_board(&state.location).unwrap();
        assert_eq!(on_disk, state.board);
        assert_eq!(on_disk.find_list("Main").unwrap().tasks.len(), 1);
    }

    #[test]
    fn rejected_update_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = temp_state(dir.path());
        let before = state.board.clone();

        let err = state
            .apply(Update::DeleteList {
                name: "Main".into(),
            })
            .unwrap_err();
        assert_eq!(err.downcast::<BoardError>().unwrap(), BoardError::LastList);
        assert_eq!(state.board, before);
    }

    #[test]
    fn deleting_current_list_moves_the_pointer() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = temp_state(dir.path());
        state
            .apply(Update::AddList {
                name: "Work".into(),
            })
            .unwrap();
        assert_eq!(state.current_list, "Work");

        state
            .apply(Update::DeleteList {
                name: "Work".into(),
            })
            .unwrap();
        assert_eq!(state.current_list, "Main");
    }

    #[test]
    fn rename_follows_current_list() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = temp_state(dir.path());
        state
            .apply(Update::RenameList {
                old: "Main".into(),
                new: "Inbox".into(),
            })
            .unwrap();
        assert_eq!(state.current_list, "Inbox");
        assert_eq!(state.board.first_list_name(), Some("Inbox"));
    }

    #[test]
    fn replace_board_repairs_a_dangling_pointer() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = temp_state(dir.path());

        let mut remote = Board::default();
        remote.add_list("Remote").unwrap();
        remote.delete_list("Main").unwrap();
        state.apply(Update::ReplaceBoard(remote)).unwrap();

        assert_eq!(state.current_list, "Remote");
        let on_disk = load_board(&state.location).unwrap();
        assert_eq!(on_disk, state.board);
    }

    #[test]
    fn select_unknown_list_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = temp_state(dir.path());
        let err = state
            .apply(Update::SelectList {
                name: "Nope".into(),
            })
            .unwrap_err();
        assert_eq!(
            err.downcast::<BoardError>().unwrap(),
            BoardError::ListNotFound("Nope".into())
        );
    }
}
