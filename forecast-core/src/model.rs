use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use chrono_tz::Tz;

use crate::error::{Result, SnapshotError};

/// Wall-clock format used by the upstream API and by every emitted file.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Atmospheric variables published at 15-minute resolution, in column order.
pub const ATMOSPHERIC_VARIABLES: &[&str] = &[
    "temperature_2m",
    "relative_humidity_2m",
    "dew_point_2m",
    "apparent_temperature",
    "precipitation",
    "rain",
    "snowfall",
    "snow_depth",
    "weather_code",
    "pressure_msl",
    "surface_pressure",
    "cloud_cover",
    "cloud_cover_low",
    "cloud_cover_mid",
    "cloud_cover_high",
    "visibility",
    "evapotranspiration",
    "wind_speed_10m",
    "wind_speed_80m",
    "wind_direction_10m",
    "wind_direction_80m",
    "wind_gusts_10m",
    "shortwave_radiation",
    "direct_radiation",
    "diffuse_radiation",
    "direct_normal_irradiance",
    "global_tilted_irradiance",
    "terrestrial_radiation",
    "cape",
    "lifted_index",
    "convective_inhibition",
    "sunshine_duration",
    "lightning_potential",
];

/// Marine variables (waves split by total/wind/swell, plus currents), in column order.
pub const MARINE_VARIABLES: &[&str] = &[
    "wave_height",
    "wave_direction",
    "wave_period",
    "wind_wave_height",
    "wind_wave_direction",
    "wind_wave_period",
    "swell_wave_height",
    "swell_wave_direction",
    "swell_wave_period",
    "swell_wave_peak_period",
    "ocean_current_velocity",
    "ocean_current_direction",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariableFamily {
    Atmospheric,
    Marine,
}

impl VariableFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableFamily::Atmospheric => "atmospheric",
            VariableFamily::Marine => "marine",
        }
    }

    /// Families in column order.
    pub const fn all() -> &'static [VariableFamily] {
        &[VariableFamily::Atmospheric, VariableFamily::Marine]
    }

    pub fn variables(&self) -> &'static [&'static str] {
        match self {
            VariableFamily::Atmospheric => ATMOSPHERIC_VARIABLES,
            VariableFamily::Marine => MARINE_VARIABLES,
        }
    }

    /// Family a catalogue variable belongs to, if any.
    pub fn of(variable: &str) -> Option<VariableFamily> {
        Self::all()
            .iter()
            .copied()
            .find(|family| family.variables().contains(&variable))
    }
}

impl std::fmt::Display for VariableFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Forecast models queried for the atmospheric family unless configured
/// otherwise.
pub const DEFAULT_MODELS: &[&str] = &[
    "ecmwf_ifs025",
    "icon_seamless",
    "gfs_seamless",
    "meteofrance_seamless",
    "jma_seamless",
];

/// Every known variable, atmospheric first, then marine.
pub fn catalogue() -> impl Iterator<Item = (VariableFamily, &'static str)> {
    VariableFamily::all()
        .iter()
        .flat_map(|family| family.variables().iter().map(move |v| (*family, *v)))
}

/// Parses an upstream timestamp. Seconds are optional.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

/// A validated, immutable description of one forecast query.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRequest {
    latitude: f64,
    longitude: f64,
    timezone: Tz,
    past_hours: u32,
    future_hours: u32,
    variables: Vec<&'static str>,
    models: Vec<String>,
}

impl ForecastRequest {
    /// Builds a request for the full variable catalogue.
    pub fn new(
        latitude: f64,
        longitude: f64,
        timezone: &str,
        past_hours: i64,
        future_hours: i64,
    ) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(SnapshotError::input(
                "latitude",
                format!("must be within [-90, 90], got {latitude}"),
            ));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(SnapshotError::input(
                "longitude",
                format!("must be within [-180, 180], got {longitude}"),
            ));
        }

        let timezone: Tz = timezone.parse().map_err(|_| {
            SnapshotError::input(
                "timezone",
                format!("'{timezone}' is not a recognized IANA zone"),
            )
        })?;

        Ok(Self {
            latitude,
            longitude,
            timezone,
            past_hours: window_hours("past_hours", past_hours)?,
            future_hours: window_hours("future_hours", future_hours)?,
            variables: catalogue().map(|(_, v)| v).collect(),
            models: Vec::new(),
        })
    }

    /// Restricts the request to the given variables. Order is normalized to
    /// catalogue order so the output schema never depends on caller order.
    pub fn with_variables<I, S>(mut self, variables: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut wanted = Vec::new();
        for name in variables {
            let name = name.as_ref();
            if VariableFamily::of(name).is_none() {
                return Err(SnapshotError::input(
                    "variables",
                    format!("unknown variable '{name}'"),
                ));
            }
            wanted.push(name.to_string());
        }

        self.variables = catalogue()
            .map(|(_, v)| v)
            .filter(|v| wanted.iter().any(|w| w == v))
            .collect();
        Ok(self)
    }

    /// Sets the atmospheric models to compare. An empty list leaves model
    /// choice to the upstream; duplicates are dropped, first occurrence wins.
    pub fn with_models<I, S>(mut self, models: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut chosen: Vec<String> = Vec::new();
        for name in models {
            let name = name.as_ref().trim();
            let valid = !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
            if !valid {
                return Err(SnapshotError::input(
                    "models",
                    format!("'{name}' is not a model identifier"),
                ));
            }
            if !chosen.iter().any(|m| m == name) {
                chosen.push(name.to_string());
            }
        }

        self.models = chosen;
        Ok(self)
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn past_hours(&self) -> u32 {
        self.past_hours
    }

    pub fn future_hours(&self) -> u32 {
        self.future_hours
    }

    pub fn variables(&self) -> &[&'static str] {
        &self.variables
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Output columns in catalogue order. With two or more models every
    /// atmospheric variable is split into one `<variable>_<model>` column per
    /// model, which is how the upstream names multi-model series.
    pub fn columns(&self) -> Vec<String> {
        let per_model = self.models.len() > 1;
        let mut columns = Vec::new();
        for variable in &self.variables {
            if per_model && VariableFamily::of(variable) == Some(VariableFamily::Atmospheric) {
                columns.extend(self.models.iter().map(|m| format!("{variable}_{m}")));
            } else {
                columns.push(variable.to_string());
            }
        }
        columns
    }

    /// Requested variables belonging to `family`, in catalogue order.
    pub fn variables_for(&self, family: VariableFamily) -> Vec<&'static str> {
        self.variables
            .iter()
            .copied()
            .filter(|v| VariableFamily::of(v) == Some(family))
            .collect()
    }
}

fn window_hours(parameter: &'static str, hours: i64) -> Result<u32> {
    if hours < 0 {
        return Err(SnapshotError::input(
            parameter,
            format!("must be non-negative, got {hours}"),
        ));
    }
    u32::try_from(hours)
        .map_err(|_| SnapshotError::input(parameter, format!("{hours} is out of range")))
}

/// One observation of a variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time: NaiveDateTime,
    pub value: Option<f64>,
}

/// Decoded upstream payload: variable name to its time series.
///
/// Series are kept per variable because atmospheric and marine families may
/// report on different time axes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastResponse {
    series: BTreeMap<String, Vec<Sample>>,
}

impl ForecastResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, variable: impl Into<String>, samples: Vec<Sample>) {
        self.series.insert(variable.into(), samples);
    }

    /// Union on variable name. Families never share names, so on a collision
    /// the incoming series wins.
    pub fn merge(&mut self, other: ForecastResponse) {
        self.series.extend(other.series);
    }

    pub fn get(&self, variable: &str) -> Option<&[Sample]> {
        self.series.get(variable).map(Vec::as_slice)
    }

    /// Variable names in lexical order.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Sample])> {
        self.series
            .iter()
            .map(|(name, samples)| (name.as_str(), samples.as_slice()))
    }

    /// True when no variable carries a single timestamp.
    pub fn is_empty(&self) -> bool {
        self.series.values().all(Vec::is_empty)
    }
}
