//! CLI subcommand definitions

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Main CLI commands
#[derive(Subcommand)]
pub(crate) enum Commands {
    /// List indexed sessions (default)
    List,
    /// Show the files that belong to sessions
    Files {
        #[command(flatten)]
        selection: Selection,
    },
    /// Copy session files into a directory
    Copy {
        #[command(flatten)]
        selection: Selection,
        /// Destination directory
        #[arg(long, short = 'd', value_name = "DIR")]
        dest: Option<PathBuf>,
    },
    /// Delete session files
    Delete {
        #[command(flatten)]
        selection: Selection,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

/// Which sessions a file command acts on
#[derive(Debug, Clone, Default, Args)]
pub(crate) struct Selection {
    /// Session keys (DDMMYY_DEVICE_VOLUME)
    #[arg(value_name = "KEY")]
    pub(crate) keys: Vec<String>,
    /// Every session passing the date and device filters
    #[arg(long, conflicts_with = "keys")]
    pub(crate) all: bool,
}

/// What a file command does with the resolved files
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FileAction {
    Show,
    Copy { dest: Option<PathBuf> },
    Delete { assume_yes: bool },
}

/// Normalized command
#[derive(Debug, Clone)]
pub(crate) enum Action {
    List,
    Files {
        selection: Selection,
        action: FileAction,
    },
}

/// Parse CLI command, defaulting to `list`
pub(crate) fn parse_command(cmd: Option<Commands>) -> Action {
    match cmd {
        None | Some(Commands::List) => Action::List,
        Some(Commands::Files { selection }) => Action::Files {
            selection,
            action: FileAction::Show,
        },
        Some(Commands::Copy { selection, dest }) => Action::Files {
            selection,
            action: FileAction::Copy { dest },
        },
        Some(Commands::Delete { selection, yes }) => Action::Files {
            selection,
            action: FileAction::Delete { assume_yes: yes },
        },
    }
}
