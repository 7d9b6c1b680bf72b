use crate::cli::{ListsCommand, SyncCommand};
use crate::model::{Task, TaskId, TaskList};
use crate::state::{AppState, Update};
use crate::storage;
use crate::sync::{self, SyncConfig};
use crate::ui;
use anyhow::{anyhow, bail, Result};
use chrono::{Local, NaiveDate};

pub fn init() -> Result<()> {
    let location = storage::init_project_board()?;
    println!("Initialized board at {}", location.path.display());
    Ok(())
}

pub fn list(list: Option<String>) -> Result<()> {
    let state = AppState::load()?;
    let today = Local::now().date_naive();
    let filter = list.as_deref();
    if let Some(name) = filter {
        if state.board.find_list(name).is_none() {
            bail!("list not found: {}", name);
        }
    }
    for task_list in &state.board.lists {
        if let Some(name) = filter {
            if task_list.name != name {
                continue;
            }
        }
        print_list(task_list, &state.current_list, today);
        println!();
    }
    Ok(())
}

pub fn add(text: String, due: Option<String>, list: Option<String>) -> Result<()> {
    let mut state = AppState::load()?;
    let due = parse_due(due.as_deref())?;
    let list = target_list(&state, list);
    let message = state.apply(Update::AddTask { list, text, due })?;
    println!("{}", message);
    Ok(())
}

pub fn edit(
    id: TaskId,
    text: Option<String>,
    due: Option<String>,
    clear_due: bool,
    list: Option<String>,
) -> Result<()> {
    if text.is_none() && due.is_none() && !clear_due {
        bail!("nothing to change (pass --text, --due, or --clear-due)");
    }
    if due.is_some() && clear_due {
        bail!("--due and --clear-due are mutually exclusive");
    }
    let mut state = AppState::load()?;
    let list = target_list(&state, list);
    if let Some(text) = text {
        let message = state.apply(Update::EditTaskText {
            list: list.clone(),
            id,
            text,
        })?;
        println!("{}", message);
    }
    if clear_due {
        let message = state.apply(Update::SetDue {
            list: list.clone(),
            id,
            due: None,
        })?;
        println!("{}", message);
    } else if let Some(raw) = due {
        let due = parse_due(Some(&raw))?;
        let message = state.apply(Update::SetDue { list, id, due })?;
        println!("{}", message);
    }
    Ok(())
}

pub fn toggle(id: TaskId, list: Option<String>) -> Result<()> {
    let mut state = AppState::load()?;
    let list = target_list(&state, list);
    let message = state.apply(Update::ToggleTask { list, id })?;
    println!("{}", message);
    Ok(())
}

pub fn rm(id: TaskId, list: Option<String>) -> Result<()> {
    let mut state = AppState::load()?;
    let list = target_list(&state, list);
    let message = state.apply(Update::DeleteTask { list, id })?;
    println!("{}", message);
    Ok(())
}

pub fn lists(action: Option<ListsCommand>) -> Result<()> {
    let mut state = AppState::load()?;
    let update = match action {
        None => {
            for list in &state.board.lists {
                let marker = if list.name == state.current_list { "*" } else { " " };
                println!("{} {} ({})", marker, list.name, list.tasks.len());
            }
            return Ok(());
        }
        Some(ListsCommand::Add { name }) => Update::AddList { name },
        Some(ListsCommand::Rename { old, new }) => Update::RenameList { old, new },
        Some(ListsCommand::Rm { name }) => Update::DeleteList { name },
        Some(ListsCommand::Use { name }) => Update::SelectList { name },
    };
    let message = state.apply(update)?;
    println!("{}", message);
    Ok(())
}

pub fn sync(action: SyncCommand) -> Result<()> {
    match action {
        SyncCommand::Login {
            endpoint,
            user,
            token,
        } => login(endpoint, user, token),
        SyncCommand::Logout => logout(),
        SyncCommand::Push => push(),
        SyncCommand::Pull => pull(),
        SyncCommand::Status => status(),
    }
}

pub fn tui() -> Result<()> {
    let state = AppState::load()?;
    ui::run(state)
}

fn login(endpoint: String, user: String, token: String) -> Result<()> {
    let endpoint = endpoint.trim().to_string();
    let user = user.trim().to_string();
    if endpoint.is_empty() || user.is_empty() {
        bail!("endpoint and user must not be empty");
    }
    sync::save_config(&SyncConfig {
        endpoint,
        user_id: user.clone(),
        token,
    })?;
    println!("Signed in as {}", user);

    // First reconciliation: adopt the remote board if one exists, otherwise
    // seed the remote document with the local board.
    let mut state = AppState::load()?;
    match state.pull_snapshot() {
        Ok(message) => println!("{}", message),
        Err(err) => println!("Sync unavailable: {}", err),
    }
    Ok(())
}

fn logout() -> Result<()> {
    if sync::clear_config()? {
        println!("Signed out");
    } else {
        println!("You are currently signed out");
    }
    Ok(())
}

fn push() -> Result<()> {
    let mut state = AppState::load()?;
    if !state.is_synced() {
        bail!("not logged in (run `cozio sync login` first)");
    }
    state.push_snapshot();
    println!("{}", state.sync_status);
    Ok(())
}

fn pull() -> Result<()> {
    let mut state = AppState::load()?;
    let message = state.pull_snapshot()?;
    println!("{}", message);
    Ok(())
}

fn status() -> Result<()> {
    let state = AppState::load()?;
    println!("Board: {}", state.location.path.display());
    match sync::load_config()? {
        Some(config) => {
            println!("Endpoint: {}", config.endpoint);
            println!("User: {}", config.user_id);
            let client = sync::RemoteClient::new(config)?;
            match client.fetch() {
                Ok(Some(_)) => println!("Remote: reachable, document present"),
                Ok(None) => println!("Remote: reachable, no document yet"),
                Err(err) => println!("Remote: {}", err),
            }
        }
        None => println!("Not logged in"),
    }
    Ok(())
}

fn target_list(state: &AppState, list: Option<String>) -> String {
    list.unwrap_or_else(|| state.current_list.clone())
}

fn parse_due(input: Option<&str>) -> Result<Option<NaiveDate>> {
    let raw = match input {
        Some(r) => r.trim(),
        None => return Ok(None),
    };
    if raw.is_empty() {
        return Ok(None);
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| anyhow!("invalid date format (use YYYY-MM-DD): {}", raw))?;
    Ok(Some(date))
}

fn print_list(list: &TaskList, current: &str, today: NaiveDate) {
    let marker = if list.name == current { "*" } else { " " };
    println!("{} {}", marker, list.name);
    if list.tasks.is_empty() {
        println!("    (empty)");
        return;
    }
    for task in list.sorted_tasks() {
        print_task(task, today);
    }
}

fn print_task(task: &Task, today: NaiveDate) {
    let check = if task.completed { "x" } else { " " };
    let mut line = format!("  [{}] {:>3} {}", check, task.id, task.text);
    if let Some(due) = task.due {
        line.push_str(&format!("  (due {}", due.format("%Y-%m-%d")));
        if task.is_overdue(today) {
            line.push_str(", overdue");
        }
        line.push(')');
    }
    println!("{}", line);
}
