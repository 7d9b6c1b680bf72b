use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub type TaskId = u32;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
    #[serde(default)]
    pub due: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TaskList {
    pub name: String,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Board {
    pub lists: Vec<TaskList>,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum BoardError {
    #[error("task text cannot be empty")]
    EmptyTaskText,
    #[error("list name cannot be empty")]
    EmptyListName,
    #[error("a list named {0} already exists")]
    DuplicateListName(String),
    #[error("list not found: {0}")]
    ListNotFound(String),
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    #[error("cannot delete the only remaining list")]
    LastList,
}

impl Default for Board {
    fn default() -> Self {
        Board {
            lists: vec![TaskList {
                name: "Main".into(),
                tasks: Vec::new(),
            }],
        }
    }
}

impl Board {
    pub fn find_list(&self, name: &str) -> Option<&TaskList> {
        self.lists.iter().find(|l| l.name == name)
    }

    pub fn find_list_mut(&mut self, name: &str) -> Option<&mut TaskList> {
        self.lists.iter_mut().find(|l| l.name == name)
    }

    pub fn first_list_name(&self) -> Option<&str> {
        self.lists.first().map(|l| l.name.as_str())
    }

    pub fn add_list(&mut self, name: &str) -> Result<(), BoardError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BoardError::EmptyListName);
        }
        if self.find_list(name).is_some() {
            return Err(BoardError::DuplicateListName(name.to_string()));
        }
        self.lists.push(TaskList {
            name: name.to_string(),
            tasks: Vec::new(),
        });
        Ok(())
    }

    pub fn rename_list(&mut self, old: &str, new: &str) -> Result<(), BoardError> {
        let new = new.trim();
        if new.is_empty() {
            return Err(BoardError::EmptyListName);
        }
        if new == old {
            return Ok(());
        }
        if self.find_list(new).is_some() {
            return Err(BoardError::DuplicateListName(new.to_string()));
        }
        let list = self
            .find_list_mut(old)
            .ok_or_else(|| BoardError::ListNotFound(old.to_string()))?;
        list.name = new.to_string();
        Ok(())
    }

    pub fn delete_list(&mut self, name: &str) -> Result<(), BoardError> {
        if self.lists.len() == 1 {
            return Err(BoardError::LastList);
        }
        if self.find_list(name).is_none() {
            return Err(BoardError::ListNotFound(name.to_string()));
        }
        self.lists.retain(|l| l.name != name);
        Ok(())
    }

    pub fn add_task(
        &mut self,
        list: &str,
        text: &str,
        due: Option<NaiveDate>,
    ) -> Result<TaskId, BoardError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(BoardError::EmptyTaskText);
        }
        let list = self
            .find_list_mut(list)
            .ok_or_else(|| BoardError::ListNotFound(list.to_string()))?;
        let id = list.next_task_id();
        list.tasks.push(Task {
            id,
            text: text.to_string(),
            completed: false,
            due,
        });
        Ok(id)
    }

    pub fn edit_task_text(&mut self, list: &str, id: TaskId, text: &str) -> Result<(), BoardError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(BoardError::EmptyTaskText);
        }
        let task = self.task_mut(list, id)?;
        task.text = text.to_string();
        Ok(())
    }

    pub fn set_due(
        &mut self,
        list: &str,
        id: TaskId,
        due: Option<NaiveDate>,
    ) -> Result<(), BoardError> {
        let task = self.task_mut(list, id)?;
        task.due = due;
        Ok(())
    }

    pub fn toggle_task(&mut self, list: &str, id: TaskId) -> Result<bool, BoardError> {
        let task = self.task_mut(list, id)?;
        task.completed = !task.completed;
        Ok(task.completed)
    }

    pub fn delete_task(&mut self, list: &str, id: TaskId) -> Result<(), BoardError> {
        let list = self
            .find_list_mut(list)
            .ok_or_else(|| BoardError::ListNotFound(list.to_string()))?;
        if !list.tasks.iter().any(|t| t.id == id) {
            return Err(BoardError::TaskNotFound(id));
        }
        list.tasks.retain(|t| t.id != id);
        Ok(())
    }

    fn task_mut(&mut self, list: &str, id: TaskId) -> Result<&mut Task, BoardError> {
        let list = self
            .find_list_mut(list)
            .ok_or_else(|| BoardError::ListNotFound(list.to_string()))?;
        list.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(BoardError::TaskNotFound(id))
    }
}

impl TaskList {
    pub fn next_task_id(&self) -> TaskId {
        self.tasks.iter().map(|t| t.id).max().map_or(1, |m| m + 1)
    }

    /// Tasks in display order; stored order stays insertion order.
    pub fn sorted_tasks(&self) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.iter().collect();
        tasks.sort_by(|a, b| display_order(a, b));
        tasks
    }
}

impl Task {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.completed && self.due.map_or(false, |d| d < today)
    }
}

/// Display order: incomplete before completed, dated before undated,
/// sooner dates first, then ascending id.
pub fn display_order(a: &Task, b: &Task) -> Ordering {
    if a.completed != b.completed {
        return if a.completed {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if a.completed {
        return a.id.cmp(&b.id);
    }
    match (a.due, b.due) {
        (Some(da), Some(db)) => da.cmp(&db).then(a.id.cmp(&b.id)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.id.cmp(&b.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn task(id: TaskId, completed: bool, due: Option<&str>) -> Task {
        Task {
            id,
            text: format!("task {}", id),
            completed,
            due: due.map(date),
        }
    }

    fn board_with(tasks: Vec<Task>) -> Board {
        Board {
            lists: vec![TaskList {
                name: "Main".into(),
                tasks,
            }],
        }
    }

    #[test]
    fn completed_tasks_sort_last() {
        let list = TaskList {
            name: "Main".into(),
            tasks: vec![
                task(1, true, None),
                task(2, false, None),
                task(3, true, Some("2024-01-01")),
                task(4, false, Some("2030-06-01")),
            ],
        };
        let sorted = list.sorted_tasks();
        let split = sorted.iter().position(|t| t.completed).unwrap();
        assert!(sorted[..split].iter().all(|t| !t.completed));
        assert!(sorted[split..].iter().all(|t| t.completed));
    }

    #[test]
    fn dated_tasks_precede_undated_and_sort_by_date() {
        let list = TaskList {
            name: "Main".into(),
            tasks: vec![
                task(1, false, None),
                task(2, false, Some("2024-05-02")),
                task(3, false, Some("2024-05-01")),
                task(4, false, None),
            ],
        };
        let sorted = list.sorted_tasks();
        let ids: Vec<TaskId> = sorted.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3, 2, 1, 4]);
        let dates: Vec<NaiveDate> = sorted.iter().filter_map(|t| t.due).collect();
        let mut ascending = dates.clone();
        ascending.sort();
        assert_eq!(dates, ascending);
    }

    #[test]
    fn sorting_is_idempotent() {
        let list = TaskList {
            name: "Main".into(),
            tasks: vec![
                task(5, true, Some("2024-01-01")),
                task(2, false, None),
                task(9, false, Some("2024-03-03")),
                task(1, true, None),
                task(7, false, Some("2024-03-03")),
            ],
        };
        let once: Vec<TaskId> = list.sorted_tasks().iter().map(|t| t.id).collect();
        let resorted = TaskList {
            name: "Main".into(),
            tasks: list.sorted_tasks().into_iter().cloned().collect(),
        };
        let twice: Vec<TaskId> = resorted.sorted_tasks().iter().map(|t| t.id).collect();
        assert_eq!(once, twice);
    }

    #[test]
    fn completed_tasks_order_by_id() {
        let list = TaskList {
            name: "Main".into(),
            tasks: vec![
                task(4, true, Some("2020-01-01")),
                task(2, true, None),
                task(3, true, Some("2031-01-01")),
            ],
        };
        let ids: Vec<TaskId> = list.sorted_tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[test]
    fn overdue_requires_incomplete_and_past_date() {
        let today = date("2024-06-15");
        assert!(task(1, false, Some("2024-06-14")).is_overdue(today));
        assert!(!task(2, false, Some("2024-06-15")).is_overdue(today));
        assert!(!task(3, false, Some("2024-06-16")).is_overdue(today));
        assert!(!task(4, false, None).is_overdue(today));
        assert!(!task(5, true, Some("2000-01-01")).is_overdue(today));
    }

    #[test]
    fn next_id_is_max_plus_one() {
        let mut board = board_with(vec![
            task(1, false, None),
            task(3, true, None),
            task(5, false, None),
        ]);
        let id = board.add_task("Main", "newest", None).unwrap();
        assert_eq!(id, 6);
        let empty = TaskList {
            name: "Empty".into(),
            tasks: Vec::new(),
        };
        assert_eq!(empty.next_task_id(), 1);
    }

    #[test]
    fn empty_task_text_is_rejected() {
        let mut board = board_with(Vec::new());
        assert_eq!(
            board.add_task("Main", "   ", None),
            Err(BoardError::EmptyTaskText)
        );
        assert!(board.find_list("Main").unwrap().tasks.is_empty());
    }

    #[test]
    fn deleting_last_list_is_refused() {
        let mut board = Board::default();
        let before = board.clone();
        assert_eq!(board.delete_list("Main"), Err(BoardError::LastList));
        assert_eq!(board, before);
    }

    #[test]
    fn deleting_a_list_keeps_the_rest() {
        let mut board = Board::default();
        board.add_list("Work").unwrap();
        board.delete_list("Main").unwrap();
        assert_eq!(board.first_list_name(), Some("Work"));
    }

    #[test]
    fn duplicate_list_names_are_rejected() {
        let mut board = Board::default();
        board.add_list("Work").unwrap();
        assert_eq!(
            board.add_list("Work"),
            Err(BoardError::DuplicateListName("Work".into()))
        );
    }

    #[test]
    fn rename_to_existing_name_is_rejected() {
        let mut board = Board::default();
        board.add_list("Work").unwrap();
        board.add_task("Main", "keep me", None).unwrap();
        let before = board.clone();
        assert_eq!(
            board.rename_list("Work", "Main"),
            Err(BoardError::DuplicateListName("Main".into()))
        );
        assert_eq!(board, before);
    }

    #[test]
    fn rename_to_same_name_is_a_noop() {
        let mut board = Board::default();
        assert_eq!(board.rename_list("Main", "Main"), Ok(()));
        assert_eq!(board.first_list_name(), Some("Main"));
    }

    #[test]
    fn toggle_flips_completion() {
        let mut board = board_with(vec![task(1, false, None)]);
        assert!(board.toggle_task("Main", 1).unwrap());
        assert!(!board.toggle_task("Main", 1).unwrap());
    }

    #[test]
    fn serde_round_trip_preserves_board() {
        let mut board = Board::default();
        board.add_list("Work").unwrap();
        board
            .add_task("Main", "water plants", Some(date("2024-09-01")))
            .unwrap();
        board.add_task("Work", "file report", None).unwrap();
        board.toggle_task("Work", 1).unwrap();

        let yaml = serde_yaml::to_string(&board).unwrap();
        let reloaded: Board = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(board, reloaded);

        let json = serde_json::to_string(&board).unwrap();
        let reloaded: Board = serde_json::from_str(&json).unwrap();
        assert_eq!(board, reloaded);
    }
}
