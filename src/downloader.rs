use crate::calendar::format_date;
use crate::ledger::Ledger;
use crate::loader::{HISTORY_HEADER, RECORD_HEADER};
use crate::record::{BacklogRecord, HistoryPoint};
use serde_json::json;
use std::error::Error;

/// Convert backlog records to CSV format
///
/// Produces the canonical layout read back by
/// [`records_from_csv`](crate::loader::records_from_csv):
/// - Header row `Subject,Number of Lectures,Last Updated`
/// - One row per record, in ledger order
/// - Subjects containing commas, quotes or newlines are quoted
/// - Every line ends with `\n`
///
/// # Examples
/// ```
/// use backlog::downloader::records_to_csv;
/// use backlog::loader::records_from_csv;
///
/// let csv = "Subject,Number of Lectures,Last Updated\n\"Maths, Calculus\",4,2024-01-08\n";
/// let records = records_from_csv(csv).unwrap();
/// assert_eq!(records_to_csv(&records), csv);
/// ```
pub fn records_to_csv(records: &[BacklogRecord]) -> String {
    let mut csv_content = RECORD_HEADER.join(",");
    csv_content.push('\n');

    for record in records {
        csv_content.push_str(&escape_field(&record.subject));
        csv_content.push(',');
        csv_content.push_str(&record.lectures.to_string());
        csv_content.push(',');
        csv_content.push_str(&format_date(record.last_updated));
        csv_content.push('\n');
    }

    csv_content
}

/// Convert history points to CSV with a `Date,Total Backlog` header.
pub fn history_to_csv(history: &[HistoryPoint]) -> String {
    let mut csv_content = HISTORY_HEADER.join(",");
    csv_content.push('\n');

    for point in history {
        csv_content.push_str(&format!(
            "{},{}\n",
            format_date(point.date),
            point.total_backlog
        ));
    }

    csv_content
}

/// Pretty-printed JSON with the records, the history and the total backlog.
pub fn to_json(ledger: &Ledger) -> Result<String, serde_json::Error> {
    let value = json!({
        "total_backlog": ledger.total_backlog(),
        "records": ledger.records(),
        "history": ledger.history(),
    });
    serde_json::to_string_pretty(&value)
}

/// Convert the ledger to XLSX format
///
/// The workbook holds a `Backlog` sheet laid out like the CSV records file
/// and a `History` sheet with one row per date.
#[cfg(feature = "xlsx")]
pub fn to_xlsx(ledger: &Ledger) -> Result<Vec<u8>, Box<dyn Error>> {
    use rust_xlsxwriter::{Workbook, Worksheet};

    let mut workbook = Workbook::new();

    let mut backlog = Worksheet::new();
    backlog.set_name("Backlog")?;
    for (c, title) in RECORD_HEADER.iter().enumerate() {
        backlog.write_string(0, c as u16, *title)?;
    }
    for (r, record) in ledger.records().iter().enumerate() {
        let row = (r + 1) as u32;
        backlog.write_string(row, 0, record.subject.as_str())?;
        backlog.write_number(row, 1, record.lectures as f64)?;
        backlog.write_string(row, 2, &format_date(record.last_updated))?;
    }
    workbook.push_worksheet(backlog);

    let mut history = Worksheet::new();
    history.set_name("History")?;
    for (c, title) in HISTORY_HEADER.iter().enumerate() {
        history.write_string(0, c as u16, *title)?;
    }
    for (r, point) in ledger.history().iter().enumerate() {
        let row = (r + 1) as u32;
        history.write_string(row, 0, &format_date(point.date))?;
        history.write_number(row, 1, point.total_backlog as f64)?;
    }
    workbook.push_worksheet(history);

    let buffer = workbook.save_to_buffer()?;
    Ok(buffer)
}

#[cfg(not(feature = "xlsx"))]
pub fn to_xlsx(_ledger: &Ledger) -> Result<Vec<u8>, Box<dyn Error>> {
    Err("XLSX export requires the 'xlsx' feature".into())
}

// Quote a field when it contains a separator, a quote or a line break
fn escape_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{history_from_csv, records_from_csv};
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn empty_ledger_renders_headers_only() {
        assert_eq!(records_to_csv(&[]), "Subject,Number of Lectures,Last Updated\n");
        assert_eq!(history_to_csv(&[]), "Date,Total Backlog\n");
    }

    #[test]
    fn canonical_csv_survives_read_and_write() {
        let csv = "Subject,Number of Lectures,Last Updated\n\
                   Physics,16,2024-01-08\n\
                   \"He said \"\"read\"\"\",0,2024-01-02\n\
                   physics,3,2024-01-08\n";

        assert_eq!(records_to_csv(&records_from_csv(csv).unwrap()), csv);

        let history = "Date,Total Backlog\n2024-01-07,12\n2024-01-08,19\n";
        assert_eq!(history_to_csv(&history_from_csv(history).unwrap()), history);
    }

    #[test]
    fn escapes_only_when_needed() {
        assert_eq!(escape_field("Physics"), "Physics");
        assert_eq!(escape_field("A, B"), "\"A, B\"");
        assert_eq!(escape_field("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn json_lists_records_and_total() {
        let mut ledger = Ledger::new();
        ledger.add_subject("Physics", 4, d(8)).unwrap();
        ledger.add_subject("Maths", 3, d(8)).unwrap();
        ledger.mark_completed("Maths", 2, d(8)).unwrap();

        let value: serde_json::Value = serde_json::from_str(&to_json(&ledger).unwrap()).unwrap();

        assert_eq!(value["total_backlog"], 6);
        assert_eq!(value["records"][0]["subject"], "Physics");
        assert_eq!(value["records"][1]["last_updated"], "2024-01-08");
        assert_eq!(value["history"][0]["total_backlog"], 6);
    }
}
