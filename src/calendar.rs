use chrono::{Datelike, Local, NaiveDate, Weekday};

/// The weekday exempt from accrual. Sunday closes the week.
pub const REST_DAY: Weekday = Weekday::Sun;

/// Date format used wherever a date is written out.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn is_rest_day(date: NaiveDate) -> bool {
    date.weekday() == REST_DAY
}

/// Counts the days in `(from, to]` that are not the rest day.
///
/// The range is walked one day at a time; short ranges do not contain the
/// rest day in proportion, so no closed form is used. Returns 0 when
/// `to <= from`.
pub fn accrual_days(from: NaiveDate, to: NaiveDate) -> u64 {
    from.iter_days()
        .skip(1)
        .take_while(|day| *day <= to)
        .filter(|day| !is_rest_day(*day))
        .count() as u64
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Source of "today". The ledger never reads the clock itself.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// Local calendar date of the machine.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Always answers the same date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn week_from_monday_skips_one_sunday() {
        // 2024-01-07 is the only Sunday in (01-01, 01-08]
        assert_eq!(accrual_days(d(2024, 1, 1), d(2024, 1, 8)), 6);
    }

    #[test]
    fn range_ending_on_sunday_excludes_it() {
        // Saturday -> Sunday
        assert_eq!(accrual_days(d(2024, 1, 6), d(2024, 1, 7)), 0);
        // Saturday -> Monday
        assert_eq!(accrual_days(d(2024, 1, 6), d(2024, 1, 8)), 1);
    }

    #[test]
    fn starting_day_is_not_counted() {
        // Sunday -> Monday counts only Monday
        assert_eq!(accrual_days(d(2024, 1, 7), d(2024, 1, 8)), 1);
    }

    #[test]
    fn empty_and_reversed_ranges() {
        assert_eq!(accrual_days(d(2024, 1, 3), d(2024, 1, 3)), 0);
        assert_eq!(accrual_days(d(2024, 1, 3), d(2024, 1, 1)), 0);
    }

    #[test]
    fn four_weeks_has_four_rest_days() {
        assert_eq!(accrual_days(d(2024, 1, 1), d(2024, 1, 29)), 24);
    }

    #[test]
    fn dates_use_iso_layout() {
        assert!(is_rest_day(d(2024, 1, 7)));
        assert!(!is_rest_day(d(2024, 1, 8)));
        assert_eq!(format_date(d(2024, 3, 5)), "2024-03-05");
        assert_eq!(parse_date(" 2024-03-05 "), Some(d(2024, 3, 5)));
        assert_eq!(parse_date("05/03/2024"), None);
    }

    #[test]
    fn fixed_clock_answers_its_date() {
        assert_eq!(FixedClock(d(2024, 2, 29)).today(), d(2024, 2, 29));
    }
}
