//! CSV rendering of the hourly report
//!
//! This module centralizes the export format of a day's report:
//! - one header row
//! - the 24 hourly rows
//! - a `Total` row with the day's counts
//! - a `Daily Average` row with the day's percentages
//!
//! All functions write to a caller-supplied writer for easy testing.

use crate::types::{DailySummary, HourlyReportRow};
use std::io::Write;

/// Column headers of the exported report
pub const REPORT_HEADER: [&str; 8] = [
    "Time",
    "Qty",
    "TE Busy",
    "TE Busy %",
    "Sys Busy",
    "Sys Busy %",
    "Others",
    "Others %",
];

/// Write a day's hourly report as CSV
///
/// Hourly rows are written in the order given. The `Total` row carries the
/// summary counts with empty percentage cells; the `Daily Average` row
/// carries only the summary percentages.
///
/// # Arguments
///
/// * `rows` - Hourly rows of the day, normally 24
/// * `summary` - Daily summary of the same day
/// * `output` - Mutable reference to a writer for outputting CSV
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_report_csv(
    rows: &[HourlyReportRow],
    summary: &DailySummary,
    output: &mut dyn Write,
) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record(REPORT_HEADER)
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    for row in rows {
        writer
            .write_record(&[
                row.time.clone(),
                row.qty.to_string(),
                row.te_busy.to_string(),
                row.te_busy_percent.clone(),
                row.sys_busy.to_string(),
                row.sys_busy_percent.clone(),
                row.others.to_string(),
                row.others_percent.clone(),
            ])
            .map_err(|e| format!("Failed to write report row: {}", e))?;
    }

    writer
        .write_record(&[
            "Total".to_string(),
            summary.qty.to_string(),
            summary.te_busy.to_string(),
            String::new(),
            summary.sys_busy.to_string(),
            String::new(),
            summary.others.to_string(),
            String::new(),
        ])
        .map_err(|e| format!("Failed to write total row: {}", e))?;

    writer
        .write_record(&[
            "Daily Average",
            "",
            "",
            summary.te_busy_percent.as_str(),
            "",
            summary.sys_busy_percent.as_str(),
            "",
            summary.others_percent.as_str(),
        ])
        .map_err(|e| format!("Failed to write average row: {}", e))?;

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn row(time: &str, qty: usize, te: usize, sys: usize, others: usize) -> HourlyReportRow {
        HourlyReportRow {
            time: time.to_string(),
            qty,
            te_busy: te,
            te_busy_percent: "x".to_string(),
            sys_busy: sys,
            sys_busy_percent: "y".to_string(),
            others,
            others_percent: "z".to_string(),
        }
    }

    fn summary(qty: usize, te: usize, sys: usize) -> DailySummary {
        DailySummary {
            date: "06-07-2025".to_string(),
            qty,
            te_busy: te,
            te_busy_percent: "30.00%".to_string(),
            sys_busy: sys,
            sys_busy_percent: "20.00%".to_string(),
            others: qty - te - sys,
            others_percent: "50.00%".to_string(),
        }
    }

    #[rstest]
    #[case::no_rows(
        vec![],
        "Time,Qty,TE Busy,TE Busy %,Sys Busy,Sys Busy %,Others,Others %\n\
         Total,10,3,,2,,5,\n\
         Daily Average,,,30.00%,,20.00%,,50.00%\n"
    )]
    #[case::one_row(
        vec![row("08.00 - 08.59", 10, 3, 2, 5)],
        "Time,Qty,TE Busy,TE Busy %,Sys Busy,Sys Busy %,Others,Others %\n\
         08.00 - 08.59,10,3,x,2,y,5,z\n\
         Total,10,3,,2,,5,\n\
         Daily Average,,,30.00%,,20.00%,,50.00%\n"
    )]
    fn test_write_report_csv(#[case] rows: Vec<HourlyReportRow>, #[case] expected_output: &str) {
        let mut output = Vec::new();
        let result = write_report_csv(&rows, &summary(10, 3, 2), &mut output);
        assert!(result.is_ok());

        let output_str = String::from_utf8(output).unwrap();
        assert_eq!(output_str, expected_output);
    }

    #[test]
    fn test_rows_keep_given_order() {
        let rows = vec![row("09.00 - 09.59", 1, 0, 0, 1), row("08.00 - 08.59", 1, 1, 0, 0)];
        let mut output = Vec::new();
        write_report_csv(&rows, &summary(2, 1, 0), &mut output).unwrap();

        let output_str = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = output_str.lines().collect();
        assert!(lines[1].starts_with("09.00"));
        assert!(lines[2].starts_with("08.00"));
    }
}
