//! One complete run: validate, fetch, tabulate, emit.

use std::{fs, path::PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::{
    Config,
    emit::{csv_file_name, write_csv_file, write_html_file},
    error::{Result, SnapshotError},
    provider::ForecastSource,
    table::TableBuilder,
};

/// What a run produced.
#[derive(Debug)]
pub struct SnapshotReport {
    pub csv_path: PathBuf,
    pub html_path: Option<PathBuf>,
    /// Set when the CSV was written but the HTML page could not be.
    pub html_error: Option<SnapshotError>,
    pub rows: usize,
    pub columns: usize,
}

pub async fn run(config: &Config, source: &dyn ForecastSource) -> Result<SnapshotReport> {
    run_at(config, source, Utc::now()).await
}

/// Same as [`run`] with an explicit "now", which fixes the file date and the
/// page's generation stamp.
pub async fn run_at(
    config: &Config,
    source: &dyn ForecastSource,
    now: DateTime<Utc>,
) -> Result<SnapshotReport> {
    // Input errors surface here, before any network traffic.
    let request = config.request()?;
    let local_now = now.with_timezone(&request.timezone());

    info!(
        lat = request.latitude(),
        lon = request.longitude(),
        tz = %request.timezone(),
        past_hours = request.past_hours(),
        future_hours = request.future_hours(),
        "fetching snapshot"
    );
    let response = source.fetch(&request).await?;

    let table = TableBuilder::for_request(&request).build(&response);
    for (column, filled) in table.coverage() {
        if filled == 0 {
            debug!(%column, "no values for column");
        }
    }
    info!(rows = table.len(), columns = table.columns().len(), "built table");

    fs::create_dir_all(&config.outdir)
        .map_err(|e| SnapshotError::emission(&config.outdir, e))?;

    let csv_path = config.outdir.join(csv_file_name(
        &config.file_prefix,
        config.location_tag.as_deref(),
        local_now.date_naive(),
    ));
    write_csv_file(&table, &csv_path)?;
    info!(path = %csv_path.display(), "wrote csv");

    let mut report = SnapshotReport {
        csv_path,
        html_path: None,
        html_error: None,
        rows: table.len(),
        columns: table.columns().len(),
    };

    if config.html {
        let title = page_title(config);
        let generated = local_now.format("%Y-%m-%d %H:%M %Z").to_string();
        match write_html_file(&table, &config.outdir, &title, &generated) {
            Ok(path) => {
                info!(path = %path.display(), "wrote html");
                report.html_path = Some(path);
            }
            Err(e) => {
                warn!(error = %e, "html page not written, csv kept");
                report.html_error = Some(e);
            }
        }
    }

    Ok(report)
}

fn page_title(config: &Config) -> String {
    match config.location_tag.as_deref() {
        Some(tag) if !tag.trim().is_empty() => format!("Forecast snapshot: {}", tag.trim()),
        _ => format!(
            "Forecast snapshot: {:.2}, {:.2}",
            config.latitude, config.longitude
        ),
    }
}
