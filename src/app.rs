use crate::calendar::{format_date, Clock, SystemClock};
use crate::command::{parse_command, Command, ExportFormat, HELP};
use crate::config::Config;
use crate::downloader::{records_to_csv, to_json, to_xlsx};
use crate::error::LedgerResult;
use crate::ledger::{Accrual, Estimate, Ledger};
use crate::record::RecordState;
use crate::saving::{load_ledger, save_ledger};
use crate::store::{CsvStore, RecordStore};
use chrono::NaiveDate;
use log::{info, warn};
use std::error::Error;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

/// A ledger bound to the store it was loaded from.
///
/// Mutations run against a copy of the ledger which replaces the live one
/// only after the store accepted it, so a store failure leaves both sides as
/// they were.
pub struct Session<S: RecordStore> {
    store: S,
    ledger: Ledger,
    today: NaiveDate,
}

impl<S: RecordStore> Session<S> {
    /// Opens `store`, loads it and applies the accrual due for `today`.
    pub fn open(mut store: S, today: NaiveDate) -> LedgerResult<Self> {
        store.open()?;
        let records = store.read_all()?;
        let history = store.read_history()?;
        info!("loaded {} subjects, {} history points", records.len(), history.len());

        let mut session = Session {
            store,
            ledger: Ledger::from_parts(records, history)?,
            today,
        };
        session.accrue(today)?;
        Ok(session)
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Moves the session to `today`, accruing if the date changed.
    pub fn roll_over(&mut self, today: NaiveDate) -> LedgerResult<Vec<Accrual>> {
        if today == self.today {
            return Ok(Vec::new());
        }
        info!("date changed from {} to {}", self.today, today);
        self.today = today;
        self.accrue(today)
    }

    fn accrue(&mut self, today: NaiveDate) -> LedgerResult<Vec<Accrual>> {
        let before = self.ledger.clone();
        self.commit(|ledger| ledger.accrue_missed_days(today), Some(before))
    }

    pub fn add_subject(&mut self, subject: &str, initial_lectures: i64) -> LedgerResult<()> {
        let today = self.today;
        self.commit(
            |ledger| ledger.add_subject(subject, initial_lectures, today).map(|_| ()),
            None,
        )
    }

    pub fn mark_completed(&mut self, subject: &str, units_completed: i64) -> LedgerResult<u64> {
        let today = self.today;
        self.commit(
            |ledger| ledger.mark_completed(subject, units_completed, today),
            None,
        )
    }

    pub fn estimate(&self, daily_pace: i64) -> LedgerResult<(Vec<(String, Estimate)>, Estimate)> {
        Ok((
            self.ledger.estimate_days_to_clear(daily_pace)?,
            self.ledger.estimate_total(daily_pace)?,
        ))
    }

    /// Replaces the stored records with those of `snapshot`. Stored history
    /// is kept and today's point moves to the restored total.
    pub fn restore(&mut self, snapshot: &Ledger) -> LedgerResult<()> {
        let today = self.today;
        let records = snapshot.records().to_vec();
        self.commit(|ledger| ledger.replace_records(records, today), None)?;
        info!("restored {} subjects from snapshot", self.ledger.records().len());
        Ok(())
    }

    pub fn close(mut self) -> LedgerResult<()> {
        self.store.close()?;
        Ok(())
    }

    // Applies `op` to a draft and persists it. With `skip_if_same`, nothing
    // is written when the draft equals that ledger. A failed history write
    // puts the previous records back.
    fn commit<T>(
        &mut self,
        op: impl FnOnce(&mut Ledger) -> LedgerResult<T>,
        skip_if_same: Option<Ledger>,
    ) -> LedgerResult<T> {
        let mut draft = self.ledger.clone();
        let out = op(&mut draft)?;
        if skip_if_same.as_ref() != Some(&draft) {
            self.store.write_all(draft.records())?;
            if let Some(point) = draft.history_point(self.today) {
                if let Err(e) = self.store.append_history_point(point) {
                    if let Err(rollback) = self.store.write_all(self.ledger.records()) {
                        warn!("could not put back records after failed history write: {}", rollback);
                    }
                    return Err(e.into());
                }
            }
        }
        self.ledger = draft;
        Ok(out)
    }
}

pub fn render_backlog(ledger: &Ledger, today: NaiveDate) -> String {
    if ledger.is_empty() {
        return "No data yet. Add some subjects to get started!".to_string();
    }
    let mut out = String::new();
    for record in ledger.records() {
        let marker = match record.state(today) {
            RecordState::UpdatedToday => "",
            RecordState::Idle => "  (not updated today)",
        };
        out.push_str(&format!(
            "{:<24}{:>8} lectures{}\n",
            record.subject, record.lectures, marker
        ));
    }
    out.push_str(&format!("{:<24}{:>8} lectures", "Total", ledger.total_backlog()));
    out
}

pub fn render_history(ledger: &Ledger) -> String {
    if ledger.history().is_empty() {
        return "No history yet.".to_string();
    }
    ledger
        .history()
        .iter()
        .map(|p| format!("{}\t{}", format_date(p.date), p.total_backlog))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_estimates(pace: i64, per_subject: &[(String, Estimate)], total: Estimate) -> String {
    let mut out = format!("At {} lectures a day:\n", pace);
    for (subject, estimate) in per_subject {
        out.push_str(&format!("{:<24}{}\n", subject, estimate));
    }
    out.push_str(&format!("{:<24}{}", "All subjects", total));
    out
}

fn export(ledger: &Ledger, format: ExportFormat, path: &Path) -> Result<(), Box<dyn Error>> {
    match format {
        ExportFormat::Csv => fs::write(path, records_to_csv(ledger.records()))?,
        ExportFormat::Json => fs::write(path, to_json(ledger)?)?,
        ExportFormat::Xlsx => fs::write(path, to_xlsx(ledger)?)?,
    }
    Ok(())
}

/// Runs one command. `Ok(None)` means quit.
pub fn execute<S: RecordStore>(
    session: &mut Session<S>,
    command: Command,
    default_pace: i64,
) -> Result<Option<String>, Box<dyn Error>> {
    let message = match command {
        Command::Quit => return Ok(None),
        Command::Help => HELP.to_string(),
        Command::List => render_backlog(session.ledger(), session.today()),
        Command::History => render_history(session.ledger()),
        Command::Add { subject, lectures } => {
            session.add_subject(&subject, lectures)?;
            format!("Subject '{}' added!", subject.trim())
        }
        Command::Done { subject, units } => {
            let subject = subject.trim();
            let removed = session.mark_completed(subject, units)?;
            let left = session.ledger().get(subject).map_or(0, |r| r.lectures);
            format!("{}: backlog down by {}, {} left", subject, removed, left)
        }
        Command::Estimate { pace } => {
            let pace = pace.unwrap_or(default_pace);
            let (per_subject, total) = session.estimate(pace)?;
            render_estimates(pace, &per_subject, total)
        }
        Command::Backup(path) => {
            save_ledger(session.ledger(), &path)?;
            format!("Snapshot written to {}", path.display())
        }
        Command::Restore(path) => {
            let snapshot = load_ledger(&path)?;
            session.restore(&snapshot)?;
            format!("Restored {} subjects", session.ledger().records().len())
        }
        Command::Export { format, path } => {
            export(session.ledger(), format, &path)?;
            format!("Exported to {}", path.display())
        }
    };
    Ok(Some(message))
}

/// Prompt loop: prints the backlog, then reads commands until `q` or EOF.
pub fn run_session<S, C, R, W>(
    session: &mut Session<S>,
    clock: &C,
    default_pace: i64,
    input: R,
    output: &mut W,
) -> io::Result<()>
where
    S: RecordStore,
    C: Clock,
    R: BufRead,
    W: Write,
{
    writeln!(output, "{}", render_backlog(session.ledger(), session.today()))?;
    let mut status = String::from("ok");
    let mut lines = input.lines();

    loop {
        write!(output, "({}) > ", status)?;
        output.flush()?;

        let Some(line) = lines.next() else { break };
        let line = line?;

        if let Err(e) = session.roll_over(clock.today()) {
            warn!("accrual failed: {}", e);
            status = e.to_string();
            continue;
        }

        let Some(command) = parse_command(&line) else {
            status = String::from("invalid command");
            continue;
        };

        match execute(session, command, default_pace) {
            Ok(Some(message)) => {
                writeln!(output, "{}", message)?;
                status = String::from("ok");
            }
            Ok(None) => break,
            Err(e) => {
                warn!("command '{}' failed: {}", line.trim(), e);
                status = e.to_string();
            }
        }
    }
    writeln!(output)?;
    Ok(())
}

/// Opens the CSV store under the configured data directory and runs the
/// prompt on stdin/stdout.
pub fn run(config: &Config) -> Result<(), Box<dyn Error>> {
    let clock = SystemClock;
    let store = CsvStore::new(config.data_dir.clone());
    let mut session = Session::open(store, clock.today())?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    run_session(&mut session, &clock, config.default_pace, stdin.lock(), &mut stdout)?;

    session.close()?;
    Ok(())
}
