use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Edit resume data with undo/redo history, from the terminal.
#[derive(Parser, Debug)]
#[command(name = "resume-state", version, about)]
pub struct Cli {
    /// Config file (defaults to resume-state.json next to the executable).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the data directory from the config file.
    #[arg(long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Print the whole state as JSON.
    Show,
    /// Set a personal field (name, email, phone, address, customUrl). Omit the value to clear it.
    Set { field: String, value: Option<String> },
    /// Append a JSON record to a collection (experiences, education, skills, certifications, links).
    Add { field: String, record: String },
    /// Remove a record from a collection by index.
    Remove { field: String, index: usize },
    /// Move a record within a collection.
    Reorder { field: String, from: usize, to: usize },
    /// Set the target job.
    Target {
        #[arg(long)]
        title: String,
        #[arg(long)]
        company: String,
    },
    /// Save a job to the job list.
    AddJob {
        #[arg(long)]
        title: String,
        #[arg(long)]
        company: String,
        #[arg(long)]
        url: Option<String>,
    },
    /// Remove a saved job by index.
    RemoveJob { index: usize },
    Undo,
    Redo,
    /// Restore the state before history entry INDEX.
    Jump { index: usize },
    /// List history entries, optionally only those touching one section.
    History {
        #[arg(long)]
        section: Option<String>,
    },
    /// Forget all undo/redo history.
    ClearHistory,
    /// Clear all resume data.
    Reset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set_with_global_data_dir() {
        let cli = Cli::try_parse_from([
            "resume-state",
            "set",
            "name",
            "Alice",
            "--data-dir",
            "/tmp/r",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/r")));
        assert_eq!(
            cli.command,
            Command::Set {
                field: "name".to_string(),
                value: Some("Alice".to_string())
            }
        );
    }

    #[test]
    fn test_parse_add_job() {
        let cli = Cli::try_parse_from([
            "resume-state",
            "add-job",
            "--title",
            "Engineer",
            "--company",
            "Acme",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Command::AddJob {
                title: "Engineer".to_string(),
                company: "Acme".to_string(),
                url: None
            }
        );
    }

    #[test]
    fn test_parse_rejects_negative_index() {
        assert!(Cli::try_parse_from(["resume-state", "remove-job", "-1"]).is_err());
    }
}
