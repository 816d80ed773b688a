//! Executes parsed CLI commands against a session.
use std::io::Write;

use anyhow::{bail, Context, Result};
use serde_json::Value;

use resume_state_core::history::Section;
use resume_state_core::{
    ArrayField, JobInfo, KeyValueBackend, ResumeSession, ScalarField, UserInfo,
};

use crate::cli::Command;

pub fn run<B: KeyValueBackend>(
    session: &mut ResumeSession<B>,
    command: Command,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Command::Show => {
            let json = serde_json::to_string_pretty(session.store().state())
                .context("Failed to serialize state")?;
            writeln!(out, "{json}")?;
        }
        Command::Set { field, value } => {
            let field: ScalarField = field.parse()?;
            let recorded = session
                .update_user_info(|info| info.set_scalar(field, value))
                .is_some();
            report_edit(out, recorded)?;
        }
        Command::Add { field, record } => {
            let field: ArrayField = field.parse()?;
            let record: Value = serde_json::from_str(&record).context("Record is not valid JSON")?;
            let mut info = session.user_info().clone();
            let mut items = info.array_value(field);
            if let Value::Array(list) = &mut items {
                list.push(record);
            }
            info.set_array_value(field, items)
                .with_context(|| format!("Record does not fit {field}"))?;
            let recorded = session.set_user_info(info).is_some();
            report_edit(out, recorded)?;
        }
        Command::Remove { field, index } => {
            let field: ArrayField = field.parse()?;
            let mut info: UserInfo = session.user_info().clone();
            let len = info.array_len(field);
            if index >= len {
                bail!("{field} has {len} records, no index {index}");
            }
            let mut items = info.array_value(field);
            if let Value::Array(list) = &mut items {
                list.remove(index);
            }
            info.set_array_value(field, items)?;
            let recorded = session.set_user_info(info).is_some();
            report_edit(out, recorded)?;
        }
        Command::Reorder { field, from, to } => {
            let field: ArrayField = field.parse()?;
            if !session.reorder(field, from, to) {
                bail!("Cannot move {field} record {from} to {to}");
            }
            writeln!(out, "Moved {field} record {from} to {to}")?;
        }
        Command::Target { title, company } => {
            session.set_job_info(JobInfo::new(title, company));
            writeln!(out, "Target job updated")?;
        }
        Command::AddJob {
            title,
            company,
            url,
        } => {
            let mut job = JobInfo::new(title, company);
            job.url = url;
            session.add_job(job);
            writeln!(out, "Saved job #{}", session.store().jobs().len() - 1)?;
        }
        Command::RemoveJob { index } => match session.remove_job(index) {
            Some(_) => writeln!(out, "Removed job #{index}")?,
            None => writeln!(out, "No job #{index}")?,
        },
        Command::Undo => {
            if session.undo() {
                writeln!(out, "Undone")?;
            } else {
                writeln!(out, "Nothing to undo")?;
            }
        }
        Command::Redo => {
            if session.redo() {
                writeln!(out, "Redone")?;
            } else {
                writeln!(out, "Nothing to redo")?;
            }
        }
        Command::Jump { index } => {
            if !session.jump_to(index) {
                bail!("No history entry #{index}");
            }
            writeln!(out, "Restored state before entry #{index}")?;
        }
        Command::History { section } => {
            let section: Option<Section> = section.map(|s| s.parse()).transpose()?;
            print_history(session, section, out)?;
        }
        Command::ClearHistory => {
            session.clear_history()?;
            writeln!(out, "History cleared")?;
        }
        Command::Reset => {
            session.reset();
            writeln!(out, "All data cleared")?;
        }
    }
    Ok(())
}

fn report_edit(out: &mut impl Write, recorded: bool) -> Result<()> {
    if recorded {
        writeln!(out, "Updated")?;
    } else {
        writeln!(out, "No changes")?;
    }
    Ok(())
}

/// One line per entry; entries that can be redone are marked with `~`.
fn print_history<B: KeyValueBackend>(
    session: &ResumeSession<B>,
    section: Option<Section>,
    out: &mut impl Write,
) -> Result<()> {
    let history = session.history();
    if history.is_empty() {
        writeln!(out, "No history")?;
        return Ok(());
    }
    for (index, entry) in history.entries().iter().enumerate() {
        if section.is_some_and(|s| !entry.touches(s)) {
            continue;
        }
        let marker = if index < history.position() { ' ' } else { '~' };
        writeln!(
            out,
            "{marker}{index:>4}  {}  {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.description
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use resume_state_core::{MemoryBackend, StoreOptions};

    fn session() -> ResumeSession<MemoryBackend> {
        ResumeSession::in_memory(MemoryBackend::new(), StoreOptions::default()).unwrap()
    }

    fn exec(session: &mut ResumeSession<MemoryBackend>, command: Command) -> Result<String> {
        let mut out = Vec::new();
        run(session, command, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    fn set(field: &str, value: &str) -> Command {
        Command::Set {
            field: field.to_string(),
            value: Some(value.to_string()),
        }
    }

    #[test]
    fn test_set_then_undo() {
        let mut s = session();
        assert_eq!(exec(&mut s, set("name", "Alice")).unwrap(), "Updated\n");
        assert_eq!(exec(&mut s, set("name", "Alice")).unwrap(), "No changes\n");
        assert_eq!(exec(&mut s, Command::Undo).unwrap(), "Undone\n");
        assert!(s.user_info().name.is_none());
        assert_eq!(exec(&mut s, Command::Undo).unwrap(), "Nothing to undo\n");
    }

    #[test]
    fn test_set_unknown_field_fails() {
        let mut s = session();
        assert!(exec(&mut s, set("nickname", "Al")).is_err());
    }

    #[test]
    fn test_add_and_remove_record() {
        let mut s = session();
        let add = Command::Add {
            field: "skills".to_string(),
            record: r#"{"name": "Rust", "level": "expert"}"#.to_string(),
        };
        exec(&mut s, add).unwrap();
        assert_eq!(s.user_info().skills[0].level.as_deref(), Some("expert"));

        let bad = Command::Remove {
            field: "skills".to_string(),
            index: 3,
        };
        assert!(exec(&mut s, bad).is_err());

        let remove = Command::Remove {
            field: "skills".to_string(),
            index: 0,
        };
        exec(&mut s, remove).unwrap();
        assert!(s.user_info().skills.is_empty());
        assert_eq!(s.history().len(), 2);
    }

    #[test]
    fn test_add_rejects_wrong_record_shape() {
        let mut s = session();
        let add = Command::Add {
            field: "links".to_string(),
            record: r#"{"url": 42}"#.to_string(),
        };
        assert!(exec(&mut s, add).is_err());
        assert!(s.history().is_empty());
    }

    #[test]
    fn test_jobs() {
        let mut s = session();
        let add = Command::AddJob {
            title: "Engineer".to_string(),
            company: "Acme".to_string(),
            url: None,
        };
        assert_eq!(exec(&mut s, add).unwrap(), "Saved job #0\n");
        assert_eq!(
            exec(&mut s, Command::RemoveJob { index: 4 }).unwrap(),
            "No job #4\n"
        );
        assert_eq!(
            exec(&mut s, Command::RemoveJob { index: 0 }).unwrap(),
            "Removed job #0\n"
        );
    }

    #[test]
    fn test_history_marks_redoable_entries() {
        let mut s = session();
        exec(&mut s, set("name", "A")).unwrap();
        exec(&mut s, set("email", "a@example.com")).unwrap();
        exec(&mut s, Command::Undo).unwrap();

        let listing = exec(&mut s, Command::History { section: None }).unwrap();
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("    0"));
        assert!(lines[0].ends_with("  Name"));
        assert!(lines[1].starts_with("~   1"));
        assert!(lines[1].ends_with("  Email"));
    }

    #[test]
    fn test_history_section_filter() {
        let mut s = session();
        exec(&mut s, set("name", "A")).unwrap();
        let add = Command::Add {
            field: "links".to_string(),
            record: r#"{"url": "https://a.example"}"#.to_string(),
        };
        exec(&mut s, add).unwrap();

        let listing = exec(
            &mut s,
            Command::History {
                section: Some("links".to_string()),
            },
        )
        .unwrap();
        assert_eq!(listing.lines().count(), 1);
        assert!(listing.contains("Added Links"));
    }

    #[test]
    fn test_show_after_reset() {
        let mut s = session();
        exec(&mut s, set("phone", "555")).unwrap();
        exec(&mut s, Command::Reset).unwrap();
        let shown = exec(&mut s, Command::Show).unwrap();
        let value: Value = serde_json::from_str(&shown).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"userInfo": {}, "jobInfo": {}, "jobs": [], "content": {}})
        );
    }
}
