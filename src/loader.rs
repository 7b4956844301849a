use crate::calendar::parse_date;
use crate::error::StoreError;
use crate::record::{BacklogRecord, HistoryPoint};

pub const RECORD_HEADER: [&str; 3] = ["Subject", "Number of Lectures", "Last Updated"];
pub const HISTORY_HEADER: [&str; 2] = ["Date", "Total Backlog"];

/// Parse backlog records from CSV text
///
/// The first line must be the `Subject,Number of Lectures,Last Updated`
/// header. Blank lines are skipped; any other malformed row fails with the
/// 1-based line number it appeared on.
///
/// # Examples
/// ```
/// use backlog::loader::records_from_csv;
///
/// let csv = "Subject,Number of Lectures,Last Updated\nPhysics,12,2024-01-08\n";
/// let records = records_from_csv(csv).unwrap();
/// assert_eq!(records[0].lectures, 12);
/// ```
pub fn records_from_csv(content: &str) -> Result<Vec<BacklogRecord>, StoreError> {
    let mut records = Vec::new();
    for (line_no, fields) in data_rows(content, &RECORD_HEADER)? {
        let [subject, lectures, last_updated] = fields_as::<3>(fields, line_no)?;

        let subject = subject.trim().to_string();
        if subject.is_empty() {
            return Err(parse_error(line_no, "empty subject"));
        }
        let lectures = lectures
            .trim()
            .parse::<u64>()
            .map_err(|_| parse_error(line_no, format!("invalid lecture count '{}'", lectures)))?;
        let last_updated = parse_date(&last_updated)
            .ok_or_else(|| parse_error(line_no, format!("invalid date '{}'", last_updated)))?;

        records.push(BacklogRecord {
            subject,
            lectures,
            last_updated,
        });
    }
    Ok(records)
}

/// Parse history points from CSV text with a `Date,Total Backlog` header.
pub fn history_from_csv(content: &str) -> Result<Vec<HistoryPoint>, StoreError> {
    let mut history = Vec::new();
    for (line_no, fields) in data_rows(content, &HISTORY_HEADER)? {
        let [date, total] = fields_as::<2>(fields, line_no)?;

        let date = parse_date(&date)
            .ok_or_else(|| parse_error(line_no, format!("invalid date '{}'", date)))?;
        let total_backlog = total
            .trim()
            .parse::<u64>()
            .map_err(|_| parse_error(line_no, format!("invalid total '{}'", total)))?;

        history.push(HistoryPoint {
            date,
            total_backlog,
        });
    }
    Ok(history)
}

fn parse_error(line: usize, reason: impl Into<String>) -> StoreError {
    StoreError::Parse {
        line,
        reason: reason.into(),
    }
}

fn fields_as<const N: usize>(fields: Vec<String>, line: usize) -> Result<[String; N], StoreError> {
    let found = fields.len();
    fields
        .try_into()
        .map_err(|_| parse_error(line, format!("expected {} columns, found {}", N, found)))
}

// Checks the header and yields the remaining non-blank rows with their line numbers.
fn data_rows(content: &str, header: &[&str]) -> Result<Vec<(usize, Vec<String>)>, StoreError> {
    let mut lines = content.lines().enumerate().map(|(i, l)| (i + 1, l));

    // An empty file holds no rows.
    let Some((header_line, first)) = lines.find(|(_, l)| !l.trim().is_empty()) else {
        return Ok(Vec::new());
    };
    let found = parse_csv_row(first);
    if found.len() != header.len() || found.iter().zip(header).any(|(f, h)| f.trim() != *h) {
        return Err(parse_error(header_line, format!("expected header '{}'", header.join(","))));
    }

    Ok(lines
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(n, l)| (n, parse_csv_row(l)))
        .collect())
}

// Parse a CSV row into a vector of strings
pub(crate) fn parse_csv_row(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if let Some(&next) = chars.peek() {
                    if next == '"' && in_quotes {
                        // Double quote inside quoted field - add a single quote
                        current_field.push('"');
                        chars.next();
                    } else {
                        in_quotes = !in_quotes;
                    }
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                result.push(current_field);
                current_field = String::new();
            }
            _ => {
                current_field.push(c);
            }
        }
    }

    result.push(current_field);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn parses_quoted_fields() {
        assert_eq!(
            parse_csv_row(r#""Maths, Calculus",4,"say ""hi""""#),
            vec!["Maths, Calculus", "4", r#"say "hi""#]
        );
        assert_eq!(parse_csv_row(""), vec![""]);
    }

    #[test]
    fn reads_records_in_file_order() {
        let csv = "Subject,Number of Lectures,Last Updated\n\
                   Physics,12,2024-01-08\n\
                   \n\
                   \"Organic, Chem\",0,2024-01-07\n";

        let records = records_from_csv(csv).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].subject, "Physics");
        assert_eq!(records[1].subject, "Organic, Chem");
        assert_eq!(records[1].last_updated, NaiveDate::from_ymd_opt(2024, 1, 7).unwrap());
    }

    #[test]
    fn subjects_are_trimmed() {
        let csv = "Subject,Number of Lectures,Last Updated
 Physics ,3,2024-01-08
\"  Maths\",1,2024-01-08
";

        let records = records_from_csv(csv).unwrap();

        assert_eq!(records[0].subject, "Physics");
        assert_eq!(records[1].subject, "Maths");
        assert!(matches!(
            records_from_csv("Subject,Number of Lectures,Last Updated
  ,3,2024-01-08
"),
            Err(StoreError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn empty_input_has_no_rows() {
        assert!(records_from_csv("").unwrap().is_empty());
        assert!(history_from_csv("\n").unwrap().is_empty());
    }

    #[test]
    fn reports_line_of_bad_row() {
        let csv = "Subject,Number of Lectures,Last Updated\nPhysics,12,2024-01-08\nMaths,-2,2024-01-08\n";
        match records_from_csv(csv) {
            Err(StoreError::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected result: {:?}", other),
        }

        let csv = "Subject,Number of Lectures,Last Updated\nPhysics,12\n";
        assert!(matches!(records_from_csv(csv), Err(StoreError::Parse { line: 2, .. })));

        let csv = "Subject,Number of Lectures,Last Updated\nPhysics,1,08/01/2024\n";
        assert!(matches!(records_from_csv(csv), Err(StoreError::Parse { line: 2, .. })));
    }

    #[test]
    fn rejects_wrong_header() {
        assert!(matches!(
            records_from_csv("Subject,Lectures,Last Updated\n"),
            Err(StoreError::Parse { line: 1, .. })
        ));
        assert!(matches!(
            history_from_csv("Subject,Number of Lectures,Last Updated\n"),
            Err(StoreError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn reads_history() {
        let history = history_from_csv("Date,Total Backlog\n2024-01-08,16\n2024-01-09,14\n").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].total_backlog, 14);
    }
}
