use crate::model::Board;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const BOARD_FILE: &str = "board.yml";
const CURRENT_LIST_FILE: &str = "current_list";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardScope {
    Project,
    Global,
}

#[derive(Debug, Clone)]
pub struct BoardLocation {
    pub path: PathBuf,
    pub scope: BoardScope,
}

impl BoardLocation {
    fn current_list_path(&self) -> PathBuf {
        self.path.with_file_name(CURRENT_LIST_FILE)
    }
}

pub fn init_project_board() -> Result<BoardLocation> {
    let cwd = env::current_dir()?;
    let dir = cwd.join(".cozio");
    fs::create_dir_all(&dir).context("failed to create .cozio directory")?;
    let path = dir.join(BOARD_FILE);
    let location = BoardLocation {
        path,
        scope: BoardScope::Project,
    };
    if !location.path.exists() {
        save_board(&location, &Board::default())?;
    }
    Ok(location)
}

pub fn locate_board(start: &Path) -> Result<BoardLocation> {
    if let Some(project_path) = find_project_board(start) {
        return Ok(BoardLocation {
            path: project_path,
            scope: BoardScope::Project,
        });
    }
    let global_path = global_board_path()?;
    Ok(BoardLocation {
        path: global_path,
        scope: BoardScope::Global,
    })
}

pub fn load_board(location: &BoardLocation) -> Result<Board> {
    if location.path.exists() {
        let data = fs::read_to_string(&location.path)
            .with_context(|| format!("reading {:?}", location.path))?;
        let mut board: Board = serde_yaml::from_str(&data).context("parsing board file")?;
        if board.lists.is_empty() {
            board = Board::default();
        }
        debug!(path = %location.path.display(), lists = board.lists.len(), "loaded board");
        Ok(board)
    } else {
        let board = Board::default();
        save_board(location, &board)?;
        Ok(board)
    }
}

pub fn save_board(location: &BoardLocation, board: &Board) -> Result<()> {
    if let Some(parent) = location.path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = serde_yaml::to_string(board).context("serializing board")?;
    fs::write(&location.path, serialized)
        .with_context(|| format!("writing {:?}", location.path))?;
    debug!(path = %location.path.display(), "saved board");
    Ok(())
}

pub fn load_current_list(location: &BoardLocation, board: &Board) -> String {
    let stored = fs::read_to_string(location.current_list_path())
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    match stored {
        Some(name) if board.find_list(&name).is_some() => name,
        _ => board.first_list_name().unwrap_or("Main").to_string(),
    }
}

pub fn save_current_list(location: &BoardLocation, name: &str) -> Result<()> {
    let path = location.current_list_path();
    fs::write(&path, name).with_context(|| format!("writing {:?}", path))?;
    Ok(())
}

fn find_project_board(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(".cozio").join(BOARD_FILE);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

fn global_board_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "cozio").context("locating data directory")?;
    Ok(dirs.data_dir().join(BOARD_FILE))
}

pub fn config_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "cozio").context("locating config directory")?;
    Ok(dirs.config_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn temp_location(dir: &Path) -> BoardLocation {
        BoardLocation {
            path: dir.join(BOARD_FILE),
            scope: BoardScope::Project,
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let location = temp_location(dir.path());

        let mut board = Board::default();
        board.add_list("Errands").unwrap();
        board
            .add_task(
                "Errands",
                "renew passport",
                NaiveDate::from_ymd_opt(2025, 3, 1),
            )
            .unwrap();
        board.add_task("Main", "call dentist", None).unwrap();
        board.toggle_task("Main", 1).unwrap();
        save_board(&location, &board).unwrap();

        let reloaded = load_board(&location).unwrap();
        assert_eq!(board, reloaded);
    }

    #[test]
    fn missing_board_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let location = temp_location(dir.path());
        let board = load_board(&location).unwrap();
        assert_eq!(board.first_list_name(), Some("Main"));
        assert!(location.path.exists());
    }

    #[test]
    fn empty_lists_are_normalized_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let location = temp_location(dir.path());
        fs::write(&location.path, "lists: []\n").unwrap();
        let board = load_board(&location).unwrap();
        assert_eq!(board.first_list_name(), Some("Main"));
    }

    #[test]
    fn current_list_round_trips_and_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let location = temp_location(dir.path());
        let mut board = Board::default();
        board.add_list("Work").unwrap();
        save_board(&location, &board).unwrap();

        save_current_list(&location, "Work").unwrap();
        assert_eq!(load_current_list(&location, &board), "Work");

        // Pointer to a list that no longer exists falls back to the first list.
        save_current_list(&location, "Gone").unwrap();
        assert_eq!(load_current_list(&location, &board), "Main");
    }

    #[test]
    fn project_board_is_found_from_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join(".cozio");
        fs::create_dir_all(&project).unwrap();
        fs::write(
            project.join(BOARD_FILE),
            serde_yaml::to_string(&Board::default()).unwrap(),
        )
        .unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let location = locate_board(&nested).unwrap();
        assert_eq!(location.scope, BoardScope::Project);
        assert_eq!(location.path, project.join(BOARD_FILE));
    }
}
