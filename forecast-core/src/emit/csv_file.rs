use std::{io, path::Path};

use chrono::NaiveDate;

use crate::{
    error::{Result, SnapshotError},
    model::{TIMESTAMP_FORMAT, parse_timestamp},
    table::{OutputTable, Row, TIME_COLUMN},
};

use super::write_atomically;

/// `<prefix>_<tag>_<YYYY-MM-DD>.csv`, or `<prefix>_<YYYY-MM-DD>.csv` without a tag.
pub fn csv_file_name(prefix: &str, tag: Option<&str>, date: NaiveDate) -> String {
    match tag.map(str::trim).filter(|t| !t.is_empty()) {
        Some(tag) => format!("{prefix}_{tag}_{date}.csv"),
        None => format!("{prefix}_{date}.csv"),
    }
}

/// Header line, then one line per row. Missing values are empty cells.
pub fn write_csv<W: io::Write>(table: &OutputTable, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    let to_io = |e: csv::Error| SnapshotError::emission("csv", io::Error::from(e));

    wtr.write_record(table.header()).map_err(to_io)?;

    for row in table.rows() {
        let mut record = Vec::with_capacity(row.values.len() + 1);
        record.push(row.time.format(TIMESTAMP_FORMAT).to_string());
        record.extend(
            row.values
                .iter()
                .map(|v| v.map(|v| v.to_string()).unwrap_or_default()),
        );
        wtr.write_record(&record).map_err(to_io)?;
    }

    wtr.flush()
        .map_err(|e| SnapshotError::emission("csv", e))?;
    Ok(())
}

pub fn render_csv(table: &OutputTable) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_csv(table, &mut buf)?;
    Ok(buf)
}

pub fn write_csv_file(table: &OutputTable, path: &Path) -> Result<()> {
    write_atomically(path, |out| {
        write_csv(table, out).map_err(|e| match e {
            SnapshotError::Emission { source, .. } => SnapshotError::emission(path, source),
            other => other,
        })
    })
}

/// Reads a CSV written by [`write_csv`] back into a table.
pub fn read_csv(path: &Path) -> Result<OutputTable> {
    let origin = path.display().to_string();
    let bad = |reason: String| SnapshotError::payload(origin.as_str(), reason);

    let mut rdr = csv::Reader::from_path(path).map_err(|e| bad(e.to_string()))?;

    let header = rdr.headers().map_err(|e| bad(e.to_string()))?.clone();
    let mut fields = header.iter();
    if fields.next() != Some(TIME_COLUMN) {
        return Err(bad(format!("first column must be '{TIME_COLUMN}'")));
    }
    let columns: Vec<String> = fields.map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| bad(e.to_string()))?;
        let raw_time = record.get(0).unwrap_or_default();
        let time =
            parse_timestamp(raw_time).ok_or_else(|| bad(format!("bad timestamp '{raw_time}'")))?;

        let values = record
            .iter()
            .skip(1)
            .map(|cell| match cell {
                "" => Ok(None),
                cell => cell
                    .parse::<f64>()
                    .map(Some)
                    .map_err(|_| bad(format!("bad value '{cell}' at {raw_time}"))),
            })
            .collect::<Result<Vec<_>>>()?;

        rows.push(Row { time, values });
    }

    Ok(OutputTable::from_parts(columns, rows))
}
