//! CSV row parsing for cost-curve input tables.
//!
//! The expected layout is a header line followed by `name,production,cost,highlight`
//! rows. Malformed rows are never an error: rows with fewer than four fields, or
//! whose production or cost does not parse to a positive number, are dropped and
//! counted in the returned [`ParseReport`].

use serde::{Deserialize, Serialize};

use crate::Record;

const MIN_FIELDS: usize = 4;

/// Parsed records, sorted by ascending cost, plus drop counters.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ParseReport {
    pub records: Vec<Record>,
    /// Lines after the header, including blank and dropped ones. A final line
    /// terminator does not start a new row.
    pub rows_seen: usize,
    pub dropped_short: usize,
    pub dropped_invalid: usize,
}

impl ParseReport {
    pub fn dropped(&self) -> usize {
        self.dropped_short + self.dropped_invalid
    }
}

/// Parse CSV text (first line is a header) into cost-sorted records.
pub fn parse_csv(text: &str) -> ParseReport {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut report = ParseReport::default();

    for (sequence_id, line) in text.lines().skip(1).enumerate() {
        report.rows_seen += 1;
        let fields = split_fields(line);
        if fields.len() < MIN_FIELDS {
            report.dropped_short += 1;
            continue;
        }
        let record = map_fields(&fields, sequence_id);
        if record.production > 0.0 && record.cost > 0.0 {
            report.records.push(record);
        } else {
            report.dropped_invalid += 1;
        }
    }

    // sort_by is stable, so equal costs keep input order.
    report.records.sort_by(|a, b| a.cost.total_cmp(&b.cost));
    report
}

/// Split one line into fields.
///
/// A field is either a double-quoted run (quotes stripped) or a maximal run of
/// characters that are neither commas nor quotes, and it only counts when the
/// next non-blank character is a comma or the end of the line. Otherwise the
/// scan moves on by one character, so in `ab"cd",1` the field is `cd`.
/// Separating commas yield no field, so `a,,b` splits into two fields. A quote
/// with no closing partner is skipped.
pub fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut pos = 0;

    while let Some(ch) = line[pos..].chars().next() {
        let candidate = match ch {
            ',' => None,
            '"' => line[pos + 1..]
                .find('"')
                .map(|close| (pos + 1..pos + 1 + close, pos + close + 2)),
            _ => {
                let end = line[pos..].find([',', '"']).map_or(line.len(), |i| pos + i);
                Some((pos..end, end))
            }
        };
        match candidate {
            Some((span, end)) if ends_field(&line[end..]) => {
                fields.push(line[span].to_string());
                // Blanks before the separator belong to the field just taken.
                pos = line.len() - line[end..].trim_start().len();
            }
            _ => pos += ch.len_utf8(),
        }
    }
    fields
}

fn ends_field(rest: &str) -> bool {
    let rest = rest.trim_start();
    rest.is_empty() || rest.starts_with(',')
}

fn map_fields(fields: &[String], sequence_id: usize) -> Record {
    let name = fields[0].replace('"', "").trim().to_string();
    let production = fields
        .get(1)
        .map(|raw| parse_number(&raw.replace(['"', ','], "")))
        .unwrap_or(0.0);
    let cost = fields.get(2).map(|raw| parse_number(raw)).unwrap_or(0.0);
    let highlight = fields.get(3).is_some_and(|raw| raw.trim() == "1");
    Record {
        name,
        production,
        cost,
        highlight,
        sequence_id,
    }
}

/// Parse the longest leading decimal literal, returning 0 when there is none.
fn parse_number(raw: &str) -> f64 {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return 0.0;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    match s[..end].parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "name,production,cost,highlight";

    fn csv(rows: &[&str]) -> String {
        let mut text = String::from(HEADER);
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text
    }

    #[test]
    fn test_split_fields_honours_quotes() {
        assert_eq!(
            split_fields(r#""Mine, North",1200,850,1"#),
            vec!["Mine, North", "1200", "850", "1"]
        );
        assert_eq!(
            split_fields(r#"Alpha,"1,250",900,0"#),
            vec!["Alpha", "1,250", "900", "0"]
        );
    }

    #[test]
    fn test_split_fields_skips_empty_and_unclosed() {
        assert_eq!(split_fields("a,,b,"), vec!["a", "b"]);
        assert_eq!(split_fields(r#"a,"open"#), vec!["a", "open"]);
        assert!(split_fields("").is_empty());
        assert!(split_fields(",,,").is_empty());
    }

    #[test]
    fn test_split_fields_requires_comma_or_line_end() {
        assert_eq!(split_fields(r#"ab"cd",100,10,1"#), vec!["cd", "100", "10", "1"]);
        assert_eq!(split_fields(r#""ab"cd,100,10,1"#), vec!["cd", "100", "10", "1"]);
        assert_eq!(split_fields(r#""Mine" ,5,6,0"#), vec!["Mine", "5", "6", "0"]);

        let report = parse_csv(&csv(&[r#"ab"cd",100,10,1"#]));
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].name, "cd");
        assert_eq!(report.records[0].production, 100.0);
        assert!(report.records[0].highlight);
    }

    #[test]
    fn test_worked_example_sorted_by_cost() {
        let report = parse_csv(&csv(&["A,100,10,0", "B,200,20,1", "C,50,5,0"]));
        let names: Vec<&str> = report.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
        let ids: Vec<usize> = report.records.iter().map(|r| r.sequence_id).collect();
        assert_eq!(ids, vec![2, 0, 1]);
        assert!(report.records[2].highlight);
        assert!(!report.records[0].highlight);
        assert_eq!(report.dropped(), 0);
    }

    #[test]
    fn test_three_field_row_dropped() {
        let report = parse_csv(&csv(&["A,100,10", "B,200,20,0"]));
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].name, "B");
        assert_eq!(report.records[0].sequence_id, 1);
        assert_eq!(report.dropped_short, 1);
    }

    #[test]
    fn test_zero_or_invalid_values_dropped() {
        let report = parse_csv(&csv(&[
            "Zero,0,10,0",
            "NoCost,100,abc,0",
            "Negative,-5,10,0",
            "Good,100,10,0",
        ]));
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].name, "Good");
        assert_eq!(report.records[0].sequence_id, 3);
        assert_eq!(report.dropped_invalid, 3);
    }

    #[test]
    fn test_count_matches_valid_rows() {
        let rows = [
            "a,1,1,0", "b,0,1,0", "c,2,3,1", "d,4", "e,5,0,0", "f,6,7,0", "", "g,1,2,1",
        ];
        let report = parse_csv(&csv(&rows));
        assert_eq!(report.rows_seen, rows.len());
        assert_eq!(report.records.len(), 4);
        assert_eq!(report.records.len() + report.dropped(), report.rows_seen);
    }

    #[test]
    fn test_quoted_production_with_thousands_separator() {
        let report = parse_csv(&csv(&[r#""Big Mine","1,250.5",980,1"#]));
        let record = &report.records[0];
        assert_eq!(record.name, "Big Mine");
        assert!((record.production - 1250.5).abs() < 1e-9);
        assert!((record.cost - 980.0).abs() < 1e-9);
        assert!(record.highlight);
    }

    #[test]
    fn test_highlight_requires_literal_one() {
        let report = parse_csv(&csv(&["a,1,1, 1 ", "b,1,2,true", "c,1,3,10"]));
        let flags: Vec<bool> = report.records.iter().map(|r| r.highlight).collect();
        assert_eq!(flags, vec![true, false, false]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let report = parse_csv(&csv(&["x,1,10,0", "y,1,5,0", "z,1,10,0", "w,1,10,0"]));
        let names: Vec<&str> = report.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["y", "x", "z", "w"]);
    }

    #[test]
    fn test_crlf_and_bom() {
        let text = "\u{feff}name,production,cost,highlight\r\nA,10,5,1\r\nB,20,4,0\r\n";
        let report = parse_csv(text);
        assert_eq!(report.rows_seen, 2);
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].name, "B");
        assert!(report.records[1].highlight);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_csv("").records.is_empty());
        assert!(parse_csv(HEADER).records.is_empty());
    }

    #[test]
    fn test_parse_number_prefix_semantics() {
        assert_eq!(parse_number("12.5 USD"), 12.5);
        assert_eq!(parse_number("  42"), 42.0);
        assert_eq!(parse_number(".5"), 0.5);
        assert_eq!(parse_number("1e3x"), 1000.0);
        assert_eq!(parse_number("7e"), 7.0);
        assert_eq!(parse_number("abc"), 0.0);
        assert_eq!(parse_number("-"), 0.0);
        assert_eq!(parse_number("."), 0.0);
        assert_eq!(parse_number("inf"), 0.0);
        assert_eq!(parse_number("1e999"), 0.0);
    }
}
