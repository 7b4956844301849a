use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Outstanding lecture-units for one subject.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct BacklogRecord {
    pub subject: String,
    pub lectures: u64,
    pub last_updated: NaiveDate,
}

/// Total backlog across all subjects on a given date.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub total_backlog: u64,
}

/// Whether a record has already been touched today.
///
/// Never stored: it is derived by comparing `last_updated` with the date the
/// caller considers today.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordState {
    Idle,
    UpdatedToday,
}

impl BacklogRecord {
    pub fn create(subject: impl Into<String>, lectures: u64, today: NaiveDate) -> Self {
        BacklogRecord {
            subject: subject.into(),
            lectures,
            last_updated: today,
        }
    }

    pub fn state(&self, today: NaiveDate) -> RecordState {
        RecordState::of(self, today)
    }

    /// Removes up to `units`, never going below zero. Returns what was removed.
    pub fn reduce(&mut self, units: u64) -> u64 {
        let removed = units.min(self.lectures);
        self.lectures -= removed;
        removed
    }
}

impl RecordState {
    pub fn of(record: &BacklogRecord, today: NaiveDate) -> Self {
        if record.last_updated == today {
            RecordState::UpdatedToday
        } else {
            RecordState::Idle
        }
    }
}

/// Inserts `point` keeping `history` ascending with one entry per date.
pub fn upsert_history(history: &mut Vec<HistoryPoint>, point: HistoryPoint) {
    match history.binary_search_by_key(&point.date, |p| p.date) {
        Ok(idx) => history[idx] = point,
        Err(idx) => history.insert(idx, point),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn reduce_clamps_at_zero() {
        let mut record = BacklogRecord::create("Physics", 3, d(1));
        assert_eq!(record.reduce(2), 2);
        assert_eq!(record.reduce(5), 1);
        assert_eq!(record.lectures, 0);
    }

    #[test]
    fn state_follows_the_calendar() {
        let record = BacklogRecord::create("Maths", 0, d(2));
        assert_eq!(record.state(d(2)), RecordState::UpdatedToday);
        assert_eq!(record.state(d(3)), RecordState::Idle);
    }

    #[test]
    fn upsert_overwrites_same_date_and_keeps_order() {
        let mut history = Vec::new();
        upsert_history(&mut history, HistoryPoint { date: d(3), total_backlog: 10 });
        upsert_history(&mut history, HistoryPoint { date: d(1), total_backlog: 4 });
        upsert_history(&mut history, HistoryPoint { date: d(3), total_backlog: 7 });

        assert_eq!(
            history,
            vec![
                HistoryPoint { date: d(1), total_backlog: 4 },
                HistoryPoint { date: d(3), total_backlog: 7 },
            ]
        );
    }
}
