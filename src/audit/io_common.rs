use std::path::Path;

use bayes_audit::allocate::{county_statuses, CountySampleStatus};
use bayes_audit::builder::Builder;
use bayes_audit::Contest;
use log::debug;
use snafu::prelude::*;

use crate::audit::*;

pub const COUNTY_NAME_COLUMN: &str = "county name";
pub const TOTAL_VOTES_COLUMN: &str = "total votes";
pub const SAMPLED_COLUMN: &str = "sampled";

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
        .to_string()
}

/// A row of a table, with its line number (starting at 1 for the header).
pub type Row = (usize, Vec<String>);

fn normalize(header: &str) -> String {
    header.trim().to_lowercase()
}

/// Where the columns are in a county tally table.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TallyLayout {
    pub county_name: Option<usize>,
    pub total_votes: usize,
    /// Column index and candidate name, in column order.
    pub candidates: Vec<(usize, String)>,
}

pub fn tally_layout(headers: &[String]) -> BpResult<TallyLayout> {
    let mut county_name: Option<usize> = None;
    let mut total_votes: Option<usize> = None;
    let mut candidates: Vec<(usize, String)> = Vec::new();
    for (idx, h) in headers.iter().enumerate() {
        match normalize(h).as_str() {
            COUNTY_NAME_COLUMN => county_name = Some(idx),
            TOTAL_VOTES_COLUMN => total_votes = Some(idx),
            _ => candidates.push((idx, h.trim().to_string())),
        }
    }
    let total_votes = total_votes.context(MissingColumnSnafu {
        column: TOTAL_VOTES_COLUMN,
    })?;
    debug!(
        "tally_layout: county name column {:?}, total votes column {}, candidates {:?}",
        county_name, total_votes, candidates
    );
    Ok(TallyLayout {
        county_name,
        total_votes,
        candidates,
    })
}

pub fn parse_count(value: &str, column: &str, lineno: usize) -> BpResult<u64> {
    value.trim().parse::<u64>().context(ParsingCountSnafu {
        value: value.to_string(),
        column: column.to_string(),
        lineno,
    })
}

fn cell<'a>(row: &'a [String], idx: usize, column: &str, lineno: usize) -> BpResult<&'a str> {
    row.get(idx)
        .map(|s| s.as_str())
        .context(LineTooShortSnafu {
            column: column.to_string(),
            lineno,
        })
}

/// Turns the rows of a county tally table into a contest.
///
/// Counties without a name column are named after the source and their line.
pub fn rows_to_contest(source_name: &str, headers: &[String], rows: &[Row]) -> BpResult<Contest> {
    let layout = tally_layout(headers)?;
    let candidate_names: Vec<String> = layout.candidates.iter().map(|(_, n)| n.clone()).collect();
    let mut builder = Builder::new(&candidate_names).context(AuditSnafu {})?;
    for (lineno, row) in rows.iter() {
        let lineno = *lineno;
        let name = match layout.county_name {
            Some(idx) => cell(row, idx, COUNTY_NAME_COLUMN, lineno)?.trim().to_string(),
            None => format!("{}-{}", simplify_file_name(source_name), lineno),
        };
        let total = parse_count(
            cell(row, layout.total_votes, TOTAL_VOTES_COLUMN, lineno)?,
            TOTAL_VOTES_COLUMN,
            lineno,
        )?;
        let mut sample_tally: Vec<u64> = Vec::with_capacity(layout.candidates.len());
        for (idx, cname) in layout.candidates.iter() {
            sample_tally.push(parse_count(cell(row, *idx, cname, lineno)?, cname, lineno)?);
        }
        debug!(
            "rows_to_contest: line {}: county {} total {} sample {:?}",
            lineno, name, total, sample_tally
        );
        builder = builder
            .county(&name, total, &sample_tally)
            .context(AuditSnafu {})?;
    }
    builder.build().context(AuditSnafu {})
}

/// Reads the sampling progress table used for escalation.
pub fn rows_to_sample_status(
    headers: &[String],
    rows: &[Row],
) -> BpResult<Vec<CountySampleStatus>> {
    let find = |column: &'static str| -> BpResult<usize> {
        headers
            .iter()
            .position(|h| normalize(h) == column)
            .context(MissingColumnSnafu { column })
    };
    let name_idx = find(COUNTY_NAME_COLUMN)?;
    let total_idx = find(TOTAL_VOTES_COLUMN)?;
    let sampled_idx = find(SAMPLED_COLUMN)?;

    let mut names: Vec<String> = Vec::new();
    let mut totals: Vec<u64> = Vec::new();
    let mut sampled: Vec<u64> = Vec::new();
    for (lineno, row) in rows.iter() {
        let lineno = *lineno;
        names.push(cell(row, name_idx, COUNTY_NAME_COLUMN, lineno)?.trim().to_string());
        totals.push(parse_count(
            cell(row, total_idx, TOTAL_VOTES_COLUMN, lineno)?,
            TOTAL_VOTES_COLUMN,
            lineno,
        )?);
        sampled.push(parse_count(
            cell(row, sampled_idx, SAMPLED_COLUMN, lineno)?,
            SAMPLED_COLUMN,
            lineno,
        )?);
    }
    county_statuses(&names, &totals, &sampled).context(AuditSnafu {})
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn layout_finds_the_special_columns() {
        let layout = tally_layout(&strings(&["County Name ", " TOTAL votes", "Alice", " Bob"])).unwrap();
        assert_eq!(layout.county_name, Some(0));
        assert_eq!(layout.total_votes, 1);
        assert_eq!(
            layout.candidates,
            vec![(2, "Alice".to_string()), (3, "Bob".to_string())]
        );
        assert!(matches!(
            tally_layout(&strings(&["county name", "Alice"])),
            Err(BpError::MissingColumn { .. })
        ));
    }

    #[test]
    fn unnamed_counties_get_a_line_name() {
        let headers = strings(&["total votes", "A", "B"]);
        let rows = vec![(2, strings(&["100", "3", "4"]))];
        let contest = rows_to_contest("/tmp/data/x.csv", &headers, &rows).unwrap();
        assert_eq!(contest.counties()[0].name, "x.csv-2");
    }

    #[test]
    fn bad_counts_are_reported_with_their_line() {
        let headers = strings(&["total votes", "A", "B"]);
        let rows = vec![(2, strings(&["100", "-3", "4"]))];
        match rows_to_contest("x.csv", &headers, &rows) {
            Err(BpError::ParsingCount { lineno, column, .. }) => {
                assert_eq!(lineno, 2);
                assert_eq!(column, "A");
            }
            x => panic!("unexpected {:?}", x),
        }
        let rows = vec![(2, strings(&["10", "6", "5"]))];
        assert!(matches!(
            rows_to_contest("x.csv", &headers, &rows),
            Err(BpError::Audit {
                source: AuditError::InsufficientVotes { .. }
            })
        ));
    }
}
