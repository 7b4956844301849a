use lazy_static::lazy_static;
use regex::Regex;
use std::path::PathBuf;

lazy_static! {
    // Subject: a double-quoted string or a single bare word.
    static ref ADD_REGEX: Regex =
        Regex::new(r#"^(?i:add)\s+(?:"([^"]+)"|(\S+))\s+([+-]?[0-9]+)$"#).unwrap();
    static ref DONE_REGEX: Regex =
        Regex::new(r#"^(?i:done)\s+(?:"([^"]+)"|(\S+))\s+([+-]?[0-9]+)$"#).unwrap();
    static ref ESTIMATE_REGEX: Regex = Regex::new(r"^(?i:estimate)(?:\s+([+-]?[0-9]+))?$").unwrap();
    static ref FILE_REGEX: Regex = Regex::new(r"^(?i)(backup|restore)\s+(.+)$").unwrap();
    static ref EXPORT_REGEX: Regex = Regex::new(r"^(?i)export\s+(csv|json|xlsx)\s+(.+)$").unwrap();
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Xlsx,
}

impl ExportFormat {
    pub fn from_strng(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "json" => Some(ExportFormat::Json),
            "xlsx" => Some(ExportFormat::Xlsx),
            _ => None,
        }
    }
}

/// One line typed at the prompt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Add { subject: String, lectures: i64 },
    Done { subject: String, units: i64 },
    /// `None` uses the configured default pace.
    Estimate { pace: Option<i64> },
    List,
    History,
    Backup(PathBuf),
    Restore(PathBuf),
    Export { format: ExportFormat, path: PathBuf },
    Help,
    Quit,
}

fn subject_and_count(re: &Regex, line: &str) -> Option<(String, i64)> {
    let captures = re.captures(line)?;
    let subject = captures.get(1).or_else(|| captures.get(2))?.as_str();
    let count = captures.get(3)?.as_str().parse::<i64>().ok()?;
    Some((subject.to_string(), count))
}

/// Parses a prompt line. Returns `None` for anything unrecognised.
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    match line.to_lowercase().as_str() {
        "q" | "quit" => return Some(Command::Quit),
        "help" => return Some(Command::Help),
        "list" => return Some(Command::List),
        "history" => return Some(Command::History),
        _ => {}
    }

    if let Some((subject, lectures)) = subject_and_count(&ADD_REGEX, line) {
        return Some(Command::Add { subject, lectures });
    }
    if let Some((subject, units)) = subject_and_count(&DONE_REGEX, line) {
        return Some(Command::Done { subject, units });
    }
    if let Some(captures) = ESTIMATE_REGEX.captures(line) {
        let pace = match captures.get(1) {
            Some(m) => Some(m.as_str().parse::<i64>().ok()?),
            None => None,
        };
        return Some(Command::Estimate { pace });
    }
    if let Some(captures) = EXPORT_REGEX.captures(line) {
        let format = ExportFormat::from_strng(captures.get(1)?.as_str())?;
        let path = PathBuf::from(captures.get(2)?.as_str().trim());
        return Some(Command::Export { format, path });
    }
    if let Some(captures) = FILE_REGEX.captures(line) {
        let path = PathBuf::from(captures.get(2)?.as_str().trim());
        return match captures.get(1)?.as_str().to_lowercase().as_str() {
            "backup" => Some(Command::Backup(path)),
            _ => Some(Command::Restore(path)),
        };
    }

    None
}

pub const HELP: &str = "\
Commands:
  add <subject> <lectures>    Track a new subject
  done <subject> <units>      Record completed lectures
  estimate [pace]             Days to clear at <pace> lectures a day
  list                        Show the current backlog
  history                     Show the total backlog per day
  backup <file>               Save a compressed snapshot
  restore <file>              Replace the backlog with a snapshot
  export csv|json|xlsx <file> Write the backlog to a file
  q                           Quit
Quote subjects containing spaces: done \"Organic Chemistry\" 3";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_add_and_done() {
        assert_eq!(
            parse_command("add Physics 12"),
            Some(Command::Add {
                subject: "Physics".to_string(),
                lectures: 12
            })
        );
        assert_eq!(
            parse_command(r#"DONE "Organic Chemistry" 3"#),
            Some(Command::Done {
                subject: "Organic Chemistry".to_string(),
                units: 3
            })
        );
        // Negative counts parse; the ledger rejects them.
        assert_eq!(
            parse_command("done Maths -1"),
            Some(Command::Done {
                subject: "Maths".to_string(),
                units: -1
            })
        );
    }

    #[test]
    fn parses_estimate_with_and_without_pace() {
        assert_eq!(parse_command("estimate"), Some(Command::Estimate { pace: None }));
        assert_eq!(parse_command("estimate 3"), Some(Command::Estimate { pace: Some(3) }));
        assert_eq!(parse_command("estimate 0"), Some(Command::Estimate { pace: Some(0) }));
        assert_eq!(parse_command("estimate fast"), None);
    }

    #[test]
    fn parses_file_commands() {
        assert_eq!(
            parse_command("backup snaps/today.bin.gz"),
            Some(Command::Backup(PathBuf::from("snaps/today.bin.gz")))
        );
        assert_eq!(
            parse_command("restore old.bin.gz"),
            Some(Command::Restore(PathBuf::from("old.bin.gz")))
        );
        assert_eq!(
            parse_command("export JSON out.json"),
            Some(Command::Export {
                format: ExportFormat::Json,
                path: PathBuf::from("out.json")
            })
        );
        assert_eq!(parse_command("export pdf out.pdf"), None);
    }

    #[test]
    fn parses_simple_words() {
        assert_eq!(parse_command("  q "), Some(Command::Quit));
        assert_eq!(parse_command("List"), Some(Command::List));
        assert_eq!(parse_command("history"), Some(Command::History));
        assert_eq!(parse_command("help"), Some(Command::Help));
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("add Physics"), None);
        assert_eq!(parse_command("add Physics many"), None);
        assert_eq!(parse_command("done"), None);
        assert_eq!(parse_command("add Physics 99999999999999999999999"), None);
        assert_eq!(parse_command("remove Physics"), None);
    }
}
