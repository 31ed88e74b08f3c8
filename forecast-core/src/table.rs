//! Normalization of a multi-variable response onto one shared time axis.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;

use crate::model::{ForecastRequest, ForecastResponse, catalogue};

/// Header of the leading timestamp column.
pub const TIME_COLUMN: &str = "time";

/// One line of the output: a timestamp and a value slot per table column.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub time: NaiveDateTime,
    pub values: Vec<Option<f64>>,
}

/// Rows ordered by timestamp plus the variable columns they are aligned to.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTable {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl OutputTable {
    /// Assembles a table from parts, sorting rows and dropping duplicate
    /// timestamps (first occurrence wins). Short rows are padded with `None`.
    pub fn from_parts(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let width = columns.len();
        let mut by_time = BTreeMap::new();
        for mut row in rows {
            row.values.resize(width, None);
            by_time.entry(row.time).or_insert(row);
        }

        Self {
            columns,
            rows: by_time.into_values().collect(),
        }
    }

    /// Variable columns, without the timestamp column.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Full CSV header: timestamp column first.
    pub fn header(&self) -> Vec<&str> {
        std::iter::once(TIME_COLUMN)
            .chain(self.columns.iter().map(String::as_str))
            .collect()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn value(&self, row: usize, column: &str) -> Option<f64> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.values.get(idx).copied().flatten()
    }

    /// Number of non-empty cells per column, in column order.
    pub fn coverage(&self) -> Vec<(&str, usize)> {
        self.columns
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let filled = self
                    .rows
                    .iter()
                    .filter(|row| row.values[idx].is_some())
                    .count();
                (name.as_str(), filled)
            })
            .collect()
    }
}

/// Builds [`OutputTable`]s with a fixed column layout.
#[derive(Debug, Clone)]
pub struct TableBuilder {
    columns: Vec<String>,
}

impl TableBuilder {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Columns for every variable the request asked for, in catalogue order,
    /// split per model when several models are compared.
    pub fn for_request(request: &ForecastRequest) -> Self {
        Self::new(request.columns())
    }

    /// Columns for the complete catalogue.
    pub fn full_catalogue() -> Self {
        Self::new(catalogue().map(|(_, v)| v))
    }

    pub fn build(&self, response: &ForecastResponse) -> OutputTable {
        // Undeclared variables go after the declared ones, in lexical order.
        let mut columns = self.columns.clone();
        for name in response.variables() {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        }

        let axis: BTreeSet<NaiveDateTime> = response
            .iter()
            .flat_map(|(_, samples)| samples.iter().map(|s| s.time))
            .collect();

        let mut grid: BTreeMap<NaiveDateTime, Vec<Option<f64>>> = axis
            .into_iter()
            .map(|time| (time, vec![None; columns.len()]))
            .collect();

        for (idx, name) in columns.iter().enumerate() {
            let Some(samples) = response.get(name) else {
                continue;
            };
            for sample in samples {
                if let Some(cells) = grid.get_mut(&sample.time) {
                    // A repeated timestamp never erases a value already seen.
                    if sample.value.is_some() {
                        cells[idx] = sample.value;
                    }
                }
            }
        }

        let rows = grid
            .into_iter()
            .map(|(time, values)| Row { time, values })
            .collect();

        OutputTable { columns, rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Sample, parse_timestamp};
    use chrono::Duration;

    fn ts(raw: &str) -> NaiveDateTime {
        parse_timestamp(raw).expect("valid timestamp")
    }

    fn series(start: &str, step_minutes: i64, values: &[Option<f64>]) -> Vec<Sample> {
        let start = ts(start);
        values
            .iter()
            .enumerate()
            .map(|(i, value)| Sample {
                time: start + Duration::minutes(step_minutes * i as i64),
                value: *value,
            })
            .collect()
    }

    fn mixed_cadence_response() -> ForecastResponse {
        let mut response = ForecastResponse::new();
        response.insert(
            "wave_height",
            series("2026-10-16T11:00", 60, &[Some(1.5), Some(1.6), Some(1.7)]),
        );
        let wind: Vec<_> = (0..9).map(|i| Some(4.0 + i as f64 / 10.0)).collect();
        response.insert("wind_speed_10m", series("2026-10-16T11:00", 15, &wind));
        response
    }

    #[test]
    fn mixed_cadence_aligns_on_union_of_timestamps() {
        let builder = TableBuilder::new(["wind_speed_10m", "wave_height"]);
        let table = builder.build(&mixed_cadence_response());

        assert_eq!(table.len(), 9);
        assert_eq!(table.header(), vec!["time", "wind_speed_10m", "wave_height"]);

        for (i, row) in table.rows().iter().enumerate() {
            assert!(row.values[0].is_some(), "wind missing at row {i}");
            let on_the_hour = i % 4 == 0;
            assert_eq!(row.values[1].is_some(), on_the_hour, "wave at row {i}");
        }
        assert_eq!(table.value(4, "wave_height"), Some(1.6));
        assert_eq!(table.value(8, "wave_height"), Some(1.7));
    }

    #[test]
    fn rows_are_strictly_ascending_and_unique() {
        let mut response = mixed_cadence_response();
        // Off-grid hourly mark that no 15-minute series covers.
        response.insert(
            "swell_wave_height",
            series("2026-10-16T13:30", 60, &[Some(0.9)]),
        );
        let table = TableBuilder::full_catalogue().build(&response);

        assert_eq!(table.len(), 10);
        for pair in table.rows().windows(2) {
            assert!(pair[0].time < pair[1].time);
        }
    }

    #[test]
    fn column_order_ignores_payload_order() {
        let t = ts("2026-10-16T00:00");
        let mut a = ForecastResponse::new();
        a.insert("wave_height", vec![Sample { time: t, value: Some(1.0) }]);
        a.insert("temperature_2m", vec![Sample { time: t, value: Some(25.0) }]);

        let mut b = ForecastResponse::new();
        b.insert("temperature_2m", vec![Sample { time: t, value: Some(25.0) }]);
        b.insert("wave_height", vec![Sample { time: t, value: Some(1.0) }]);

        let builder = TableBuilder::full_catalogue();
        assert_eq!(builder.build(&a).columns(), builder.build(&b).columns());
        assert_eq!(builder.build(&a).columns()[0], "temperature_2m");
    }

    #[test]
    fn build_is_idempotent() {
        let response = mixed_cadence_response();
        let builder = TableBuilder::full_catalogue();
        assert_eq!(builder.build(&response), builder.build(&response));
    }

    #[test]
    fn empty_response_keeps_full_header() {
        let table = TableBuilder::full_catalogue().build(&ForecastResponse::new());
        assert!(table.is_empty());
        assert_eq!(table.columns().len(), catalogue().count());
        assert_eq!(table.header()[0], TIME_COLUMN);
    }

    #[test]
    fn unavailable_variable_keeps_an_empty_column() {
        let table = TableBuilder::new(["wind_speed_10m", "lightning_potential"])
            .build(&mixed_cadence_response());

        assert!(table.columns().iter().any(|c| c == "lightning_potential"));
        let coverage = table.coverage();
        assert_eq!(coverage[0], ("wind_speed_10m", 9));
        assert_eq!(coverage[1], ("lightning_potential", 0));
    }

    #[test]
    fn undeclared_variables_are_appended() {
        let table = TableBuilder::new(["wind_speed_10m"]).build(&mixed_cadence_response());
        assert_eq!(table.columns(), &["wind_speed_10m", "wave_height"]);
    }

    #[test]
    fn multi_model_request_declares_one_column_per_model() {
        let request = ForecastRequest::new(0.0, 0.0, "UTC", 0, 1)
            .unwrap()
            .with_variables(["wind_speed_10m", "wave_height"])
            .unwrap()
            .with_models(["ecmwf_ifs025", "gfs_seamless"])
            .unwrap();

        let mut response = ForecastResponse::new();
        response.insert(
            "wind_speed_10m_gfs_seamless",
            series("2026-10-16T00:00", 15, &[Some(5.0), Some(5.5)]),
        );
        response.insert("wave_height", series("2026-10-16T00:00", 60, &[Some(1.2)]));

        let table = TableBuilder::for_request(&request).build(&response);
        assert_eq!(
            table.columns(),
            &["wind_speed_10m_ecmwf_ifs025", "wind_speed_10m_gfs_seamless", "wave_height"]
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.value(1, "wind_speed_10m_gfs_seamless"), Some(5.5));
        assert_eq!(table.coverage()[0], ("wind_speed_10m_ecmwf_ifs025", 0));
    }

    #[test]
    fn from_parts_sorts_and_dedups() {
        let rows = vec![
            Row { time: ts("2026-10-16T01:00"), values: vec![Some(2.0)] },
            Row { time: ts("2026-10-16T00:00"), values: vec![] },
            Row { time: ts("2026-10-16T01:00"), values: vec![Some(9.0)] },
        ];
        let table = OutputTable::from_parts(vec!["rain".into()], rows);

        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].values, vec![None]);
        assert_eq!(table.value(1, "rain"), Some(2.0));
    }
}
