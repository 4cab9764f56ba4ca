// Reading county tallies from Excel workbooks.

use bayes_audit::Contest;
use calamine::{open_workbook, DataType, Reader, Xlsx};
use log::{debug, info};
use snafu::prelude::*;

use crate::audit::io_common::{rows_to_contest, Row};
use crate::audit::*;

fn read_cell(cell: &DataType) -> BpResult<String> {
    match cell {
        DataType::String(s) => Ok(s.clone()),
        DataType::Int(i) => Ok(i.to_string()),
        // Spreadsheets store most numbers as floats.
        DataType::Float(f) if f.fract() == 0.0 && *f >= 0.0 => Ok(format!("{}", *f as u64)),
        DataType::Float(f) => Ok(f.to_string()),
        DataType::Empty => Ok("".to_string()),
        _ => whatever!("read_cell: could not understand cell {:?}", cell),
    }
}

/// Reads the sample tallies of a contest from a worksheet laid out like the
/// CSV input: one header row, then one row per county.
pub fn read_contest_xlsx(path: &str, worksheet_name: Option<&str>) -> BpResult<Contest> {
    info!("Attempting to read Excel file {:?}", path);
    let mut workbook: Xlsx<_> =
        open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange = match worksheet_name {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { name, path })?
            .context(OpeningExcelSnafu { path })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu {})?
            .context(OpeningExcelSnafu { path })?,
    };

    let mut iter = wrange.rows();
    let header_row = iter.next().context(EmptyExcelSnafu {})?;
    let mut headers: Vec<String> = Vec::with_capacity(header_row.len());
    for c in header_row {
        headers.push(read_cell(c)?);
    }
    debug!("read_contest_xlsx: header: {:?}", headers);

    let mut rows: Vec<Row> = Vec::new();
    for (idx, row) in iter.enumerate() {
        let mut values: Vec<String> = Vec::with_capacity(row.len());
        for c in row {
            values.push(read_cell(c)?);
        }
        // Trailing blank rows are common in spreadsheets.
        if values.iter().all(|v| v.trim().is_empty()) {
            continue;
        }
        rows.push((idx + 2, values));
    }
    rows_to_contest(path, &headers, &rows)
}
