use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "cozio", version, about = "Terminal kanban to-do board with cloud sync")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a project board in the current directory
    Init,
    /// Print the board in display order
    List {
        /// Show a single list instead of the whole board
        #[arg(long)]
        list: Option<String>,
    },
    /// Add a new task
    Add {
        /// Task description
        text: String,
        /// Due date in YYYY-MM-DD format
        #[arg(long)]
        due: Option<String>,
        /// Target list (defaults to the current list)
        #[arg(long)]
        list: Option<String>,
    },
    /// Edit an existing task
    Edit {
        /// Task id to edit
        id: u32,
        /// New description
        #[arg(long)]
        text: Option<String>,
        /// Set due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
        /// Clear the due date
        #[arg(long)]
        clear_due: bool,
        /// List holding the task (defaults to the current list)
        #[arg(long)]
        list: Option<String>,
    },
    /// Toggle a task's completion flag
    Toggle {
        /// Task id to toggle
        id: u32,
        /// List holding the task (defaults to the current list)
        #[arg(long)]
        list: Option<String>,
    },
    /// Delete a task
    Rm {
        /// Task id to delete
        id: u32,
        /// List holding the task (defaults to the current list)
        #[arg(long)]
        list: Option<String>,
    },
    /// Manage task lists (prints list names when no action is given)
    Lists {
        #[command(subcommand)]
        action: Option<ListsCommand>,
    },
    /// Synchronize with the remote store
    Sync {
        #[command(subcommand)]
        action: SyncCommand,
    },
    /// Launch the interactive TUI
    Tui,
}

#[derive(Subcommand, Debug)]
pub enum ListsCommand {
    /// Create a new list
    Add {
        /// Name of the new list
        name: String,
    },
    /// Rename a list
    Rename {
        /// Current name
        old: String,
        /// New name
        new: String,
    },
    /// Delete a list (the last remaining list cannot be deleted)
    Rm {
        /// Name of the list to delete
        name: String,
    },
    /// Select the current list
    Use {
        /// Name of the list to select
        name: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum SyncCommand {
    /// Store the remote endpoint and principal credentials
    Login {
        /// Base URL of the remote store
        #[arg(long)]
        endpoint: String,
        /// Principal identifier the board document is keyed by
        #[arg(long)]
        user: String,
        /// Bearer token
        #[arg(long)]
        token: String,
    },
    /// Forget the stored credentials
    Logout,
    /// Push the local board to the remote store
    Push,
    /// Fetch the remote snapshot and reconcile (last-write-wins)
    Pull,
    /// Show the sync configuration and remote reachability
    Status,
}
