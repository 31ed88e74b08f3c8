use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use forecast_core::{Config, snapshot, source_from_config};

/// Top-level CLI struct. Every flag overrides the config file, which in turn
/// overrides the built-in defaults.
#[derive(Debug, Parser)]
#[command(
    name = "forecast-snapshot",
    version,
    about = "Write a 15-minute atmospheric + marine forecast snapshot to CSV"
)]
pub struct Cli {
    /// Target latitude in degrees [default: -22.46].
    #[arg(long, allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Target longitude in degrees [default: -40.54].
    #[arg(long, allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// IANA zone name for timestamps and the file date [default: America/Sao_Paulo].
    #[arg(long)]
    pub timezone: Option<String>,

    /// Directory for generated files [default: .].
    #[arg(long)]
    pub outdir: Option<PathBuf>,

    /// Hours of history to include [default: 24].
    #[arg(long, allow_negative_numbers = true)]
    pub past_hours: Option<i64>,

    /// Hours of forecast to include [default: 24].
    #[arg(long, allow_negative_numbers = true)]
    pub future_hours: Option<i64>,

    /// Also render the static HTML page.
    #[arg(long, overrides_with = "no_html")]
    pub html: bool,

    /// Skip the HTML page even if the config file enables it.
    #[arg(long, overrides_with = "html")]
    pub no_html: bool,

    /// Comma-separated atmospheric models to compare [default: ecmwf_ifs025,
    /// icon_seamless, gfs_seamless, meteofrance_seamless, jma_seamless].
    /// An empty value lets the upstream pick a single model.
    #[arg(long, value_delimiter = ',')]
    pub models: Option<Vec<String>>,

    /// Location tag inserted in the CSV file name.
    #[arg(long)]
    pub tag: Option<String>,

    /// Per-request timeout in seconds [default: 30].
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Read settings from this TOML file instead of the platform config dir.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the effective settings to this TOML file and exit.
    #[arg(long)]
    pub write_config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Resolve the run configuration: defaults, then file, then flags.
    pub fn settings(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };

        if let Some(lat) = self.lat {
            config.latitude = lat;
        }
        if let Some(lon) = self.lon {
            config.longitude = lon;
        }
        if let Some(tz) = &self.timezone {
            config.timezone = tz.clone();
        }
        if let Some(outdir) = &self.outdir {
            config.outdir = outdir.clone();
        }
        if let Some(hours) = self.past_hours {
            config.past_hours = hours;
        }
        if let Some(hours) = self.future_hours {
            config.future_hours = hours;
        }
        if self.html {
            config.html = true;
        } else if self.no_html {
            config.html = false;
        }
        if let Some(models) = &self.models {
            config.models = models.iter().filter(|m| !m.is_empty()).cloned().collect();
        }
        if let Some(tag) = &self.tag {
            config.location_tag = Some(tag.clone());
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout_secs = secs;
        }

        Ok(config)
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let config = self.settings()?;

        if let Some(path) = &self.write_config {
            config.save_to(path)?;
            println!("Settings written to {}", path.display());
            return Ok(());
        }

        let source = source_from_config(&config).context("Failed to set up forecast source")?;
        let report = snapshot::run(&config, source.as_ref())
            .await
            .context("Forecast snapshot failed")?;

        println!(
            "CSV  : {} ({} rows, {} columns)",
            report.csv_path.display(),
            report.rows,
            report.columns + 1
        );
        if let Some(path) = &report.html_path {
            println!("HTML : {}", path.display());
        }

        if let Some(err) = report.html_error {
            return Err(anyhow::Error::new(err).context(format!(
                "HTML page failed; CSV was written to {}",
                report.csv_path.display()
            )));
        }

        Ok(())
    }
}
