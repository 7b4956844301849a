use crate::calendar::{accrual_days, is_rest_day};
use crate::error::{LedgerError, LedgerResult};
use crate::record::{upsert_history, BacklogRecord, HistoryPoint, RecordState};
use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Per-subject backlog records plus the daily history of the total.
///
/// All operations are all-or-nothing: on error the ledger is unchanged.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
pub struct Ledger {
    records: Vec<BacklogRecord>,
    history: Vec<HistoryPoint>,
}

/// Units added to one subject by an accrual pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Accrual {
    pub subject: String,
    pub increment: u64,
}

/// Time until a backlog clears at a given pace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Estimate {
    Days(u64),
    /// The pace never outruns the daily accrual.
    Never,
}

impl fmt::Display for Estimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Estimate::Days(1) => write!(f, "1 day"),
            Estimate::Days(n) => write!(f, "{} days", n),
            Estimate::Never => write!(f, "never"),
        }
    }
}

/// Units of backlog actually removed when `units` are completed on `today`.
///
/// Outside the rest day one unit offsets that day's own accrual.
pub fn net_reduction(units: u64, today: NaiveDate) -> u64 {
    if is_rest_day(today) {
        units
    } else {
        units.saturating_sub(1)
    }
}

/// Net reduction over one week (six working days and one rest day) at `daily_pace`.
pub fn weekly_net(daily_pace: i64) -> i64 {
    6 * (daily_pace - 1) + daily_pace
}

fn days_to_clear(lectures: u64, weekly_net: i64) -> Estimate {
    if weekly_net <= 0 {
        return Estimate::Never;
    }
    let numerator = lectures as u128 * 7;
    let days = numerator.div_ceil(weekly_net as u128);
    Estimate::Days(u64::try_from(days).unwrap_or(u64::MAX))
}

fn checked_pace(daily_pace: i64) -> LedgerResult<i64> {
    if daily_pace <= 0 {
        return Err(LedgerError::InvalidArgument(format!(
            "daily pace must be positive, got {}",
            daily_pace
        )));
    }
    Ok(daily_pace)
}

fn check_unique(records: &[BacklogRecord]) -> LedgerResult<()> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.subject.as_str()) {
            return Err(LedgerError::DuplicateSubject(record.subject.clone()));
        }
    }
    Ok(())
}

impl Ledger {
    pub fn new() -> Self {
        Ledger::default()
    }

    /// Builds a ledger from stored rows.
    ///
    /// Subjects must be unique. History is sorted by date and same-date
    /// points collapse to the last one seen.
    pub fn from_parts(
        records: Vec<BacklogRecord>,
        history: Vec<HistoryPoint>,
    ) -> LedgerResult<Self> {
        check_unique(&records)?;

        let mut sorted = Vec::with_capacity(history.len());
        for point in history {
            upsert_history(&mut sorted, point);
        }

        Ok(Ledger {
            records,
            history: sorted,
        })
    }

    pub fn records(&self) -> &[BacklogRecord] {
        &self.records
    }

    pub fn history(&self) -> &[HistoryPoint] {
        &self.history
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, subject: &str) -> Option<&BacklogRecord> {
        self.records.iter().find(|r| r.subject == subject)
    }

    pub fn total_backlog(&self) -> u64 {
        self.records.iter().map(|r| r.lectures).sum()
    }

    pub fn history_point(&self, date: NaiveDate) -> Option<&HistoryPoint> {
        self.history
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|idx| &self.history[idx])
    }

    pub fn state_of(&self, subject: &str, today: NaiveDate) -> LedgerResult<RecordState> {
        self.get(subject)
            .map(|r| r.state(today))
            .ok_or_else(|| LedgerError::UnknownSubject(subject.to_string()))
    }

    pub fn add_subject(
        &mut self,
        subject: &str,
        initial_lectures: i64,
        today: NaiveDate,
    ) -> LedgerResult<&BacklogRecord> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(LedgerError::InvalidArgument(
                "subject name must not be empty".to_string(),
            ));
        }
        if subject.contains(['\n', '\r']) {
            return Err(LedgerError::InvalidArgument(
                "subject name must be a single line".to_string(),
            ));
        }
        if initial_lectures < 0 {
            return Err(LedgerError::InvalidArgument(format!(
                "initial lectures must not be negative, got {}",
                initial_lectures
            )));
        }
        if self.get(subject).is_some() {
            return Err(LedgerError::DuplicateSubject(subject.to_string()));
        }

        info!("adding subject '{}' with {} lectures", subject, initial_lectures);
        self.records
            .push(BacklogRecord::create(subject, initial_lectures as u64, today));
        Ok(&self.records[self.records.len() - 1])
    }

    /// Adds one unit per elapsed non-rest day to every record.
    ///
    /// Runs at most once per calendar day: a history point for `today` marks
    /// the day as done. Nothing accrues when `today` is the rest day.
    pub fn accrue_missed_days(&mut self, today: NaiveDate) -> LedgerResult<Vec<Accrual>> {
        if self.history_point(today).is_some() {
            debug!("accrual already applied for {}", today);
            return Ok(Vec::new());
        }
        if is_rest_day(today) {
            debug!("{} is the rest day, skipping accrual", today);
            return Ok(Vec::new());
        }

        let mut pending = Vec::new();
        for (idx, record) in self.records.iter().enumerate() {
            if record.last_updated > today {
                return Err(LedgerError::InvalidDateOrder {
                    subject: record.subject.clone(),
                    last_updated: record.last_updated,
                    today,
                });
            }
            if record.last_updated < today {
                pending.push((idx, accrual_days(record.last_updated, today)));
            }
        }

        let mut applied = Vec::with_capacity(pending.len());
        for (idx, increment) in pending {
            let record = &mut self.records[idx];
            record.lectures = record.lectures.saturating_add(increment);
            record.last_updated = today;
            info!(
                "accrued {} lectures for '{}' (now {})",
                increment, record.subject, record.lectures
            );
            applied.push(Accrual {
                subject: record.subject.clone(),
                increment,
            });
        }

        self.record_history(today);
        Ok(applied)
    }

    /// Credits `units_completed` against `subject`. Returns the net reduction.
    ///
    /// Missed non-rest days since the record's `last_updated` are added
    /// first, so completing on the rest day keeps the week's accrual.
    pub fn mark_completed(
        &mut self,
        subject: &str,
        units_completed: i64,
        today: NaiveDate,
    ) -> LedgerResult<u64> {
        if units_completed < 0 {
            return Err(LedgerError::InvalidArgument(format!(
                "completed units must not be negative, got {}",
                units_completed
            )));
        }
        let subject = subject.trim();
        let record = self
            .records
            .iter_mut()
            .find(|r| r.subject == subject)
            .ok_or_else(|| LedgerError::UnknownSubject(subject.to_string()))?;
        if record.last_updated > today {
            return Err(LedgerError::InvalidDateOrder {
                subject: record.subject.clone(),
                last_updated: record.last_updated,
                today,
            });
        }

        // Days this record has not been credited with yet, so that moving
        // `last_updated` forward does not drop them.
        let missed = accrual_days(record.last_updated, today);
        if missed > 0 {
            record.lectures = record.lectures.saturating_add(missed);
            debug!("'{}': caught up {} missed days", record.subject, missed);
        }

        let removed = record.reduce(net_reduction(units_completed as u64, today));
        record.last_updated = today;
        info!(
            "'{}': {} units done, backlog reduced by {} (now {})",
            record.subject, units_completed, removed, record.lectures
        );

        self.record_history(today);
        Ok(removed)
    }

    /// Replaces every record with `records`, keeping the history and
    /// recording today's total.
    pub fn replace_records(
        &mut self,
        records: Vec<BacklogRecord>,
        today: NaiveDate,
    ) -> LedgerResult<()> {
        check_unique(&records)?;
        if let Some(record) = records.iter().find(|r| r.last_updated > today) {
            return Err(LedgerError::InvalidDateOrder {
                subject: record.subject.clone(),
                last_updated: record.last_updated,
                today,
            });
        }

        info!("replacing {} subjects with {}", self.records.len(), records.len());
        self.records = records;
        self.record_history(today);
        Ok(())
    }

    /// Days needed per subject at `daily_pace` completed units a day, in
    /// record order.
    pub fn estimate_days_to_clear(&self, daily_pace: i64) -> LedgerResult<Vec<(String, Estimate)>> {
        let net = weekly_net(checked_pace(daily_pace)?);
        Ok(self
            .records
            .iter()
            .map(|r| (r.subject.clone(), days_to_clear(r.lectures, net)))
            .collect())
    }

    /// Days needed to clear the total backlog at `daily_pace`.
    pub fn estimate_total(&self, daily_pace: i64) -> LedgerResult<Estimate> {
        let net = weekly_net(checked_pace(daily_pace)?);
        Ok(days_to_clear(self.total_backlog(), net))
    }

    fn record_history(&mut self, today: NaiveDate) {
        let point = HistoryPoint {
            date: today,
            total_backlog: self.total_backlog(),
        };
        debug!("history point {} -> {}", point.date, point.total_backlog);
        upsert_history(&mut self.history, point);
    }
}
