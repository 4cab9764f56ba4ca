// Primitives for reading CSV files.

use std::io::Read;

use bayes_audit::allocate::CountySampleStatus;
use bayes_audit::Contest;
use log::{debug, info};
use snafu::prelude::*;

use crate::audit::io_common::{rows_to_contest, rows_to_sample_status, Row};
use crate::audit::*;

fn open_csv(path: &str) -> BpResult<csv::Reader<std::fs::File>> {
    info!("Attempting to read CSV file {:?}", path);
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .context(CsvOpenSnafu { path })
}

/// The header and the records of a table. Every record must have as many
/// fields as the header.
fn get_records<R: Read>(mut rdr: csv::Reader<R>) -> BpResult<(Vec<String>, Vec<Row>)> {
    let headers: Vec<String> = rdr
        .headers()
        .context(CsvLineParseSnafu { lineno: 1usize })?
        .iter()
        .map(|s| s.to_string())
        .collect();
    let mut rows: Vec<Row> = Vec::new();
    for (idx, line_r) in rdr.records().enumerate() {
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        debug!("get_records: {:?} {:?}", lineno, line);
        rows.push((lineno, line.iter().map(|s| s.to_string()).collect()));
    }
    Ok((headers, rows))
}

fn reader_from<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input)
}

/// Reads the sample tallies of a multi-county contest.
pub fn read_contest_csv(path: &str) -> BpResult<Contest> {
    let (headers, rows) = get_records(open_csv(path)?)?;
    rows_to_contest(path, &headers, &rows)
}

pub fn parse_contest_csv<R: Read>(source_name: &str, input: R) -> BpResult<Contest> {
    let (headers, rows) = get_records(reader_from(input))?;
    rows_to_contest(source_name, &headers, &rows)
}

/// Reads how many ballots each county has and how many were already sampled.
pub fn read_sample_status_csv(path: &str) -> BpResult<Vec<CountySampleStatus>> {
    let (headers, rows) = get_records(open_csv(path)?)?;
    rows_to_sample_status(&headers, &rows)
}

pub fn parse_sample_status_csv<R: Read>(input: R) -> BpResult<Vec<CountySampleStatus>> {
    let (headers, rows) = get_records(reader_from(input))?;
    rows_to_sample_status(&headers, &rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_a_multi_county_file() {
        let data = "county name, total votes, Alice, Bob\n1, 1000, 30, 15\n2, 2000, 40, 50\n";
        let contest = parse_contest_csv("test.csv", data.as_bytes()).unwrap();
        assert_eq!(contest.candidates(), &["Alice", "Bob"]);
        assert_eq!(contest.counties().len(), 2);
        assert_eq!(contest.counties()[1].name, "2");
        assert_eq!(contest.counties()[1].total_num_votes, 2000);
        assert_eq!(contest.counties()[1].sample_tally.counts(), &[40, 50]);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let data = "county name, total votes, Alice, Bob\n1, 1000, 30\n";
        assert!(matches!(
            parse_contest_csv("test.csv", data.as_bytes()),
            Err(BpError::CsvLineParse { lineno: 2, .. })
        ));
    }

    #[test]
    fn huge_counts_are_rejected() {
        let data = "county name, total votes, Alice, Bob\n1, 10, 18446744073709551615, 2\n";
        assert!(matches!(
            parse_contest_csv("test.csv", data.as_bytes()),
            Err(BpError::Audit {
                source: AuditError::InvalidInput(_)
            })
        ));
    }

    #[test]
    fn reads_sample_status() {
        let data = "County Name,Total Votes,Sampled\nA,10,6\nB,10,8\n";
        let statuses = parse_sample_status_csv(data.as_bytes()).unwrap();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].name, "A");
        assert_eq!(statuses[1].current_sample_size, 8);
        let data = "County Name,Total Votes\nA,10\n";
        assert!(matches!(
            parse_sample_status_csv(data.as_bytes()),
            Err(BpError::MissingColumn { .. })
        ));
    }
}
