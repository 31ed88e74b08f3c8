use std::{collections::BTreeMap, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    Config,
    error::{Result, SnapshotError},
    model::{ForecastRequest, ForecastResponse, Sample, VariableFamily, parse_timestamp},
};

use super::ForecastSource;

pub const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const MARINE_URL: &str = "https://marine-api.open-meteo.com/v1/marine";

/// Key of the 15-minute block in both the forecast and the marine payload.
const MINUTELY_15: &str = "minutely_15";
const STEPS_PER_HOUR: u32 = 4;

#[derive(Debug, Clone)]
pub struct OpenMeteoSource {
    http: Client,
    forecast_url: String,
    marine_url: String,
}

impl OpenMeteoSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("forecast-snapshot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| SnapshotError::Transport {
                endpoint: "http client".to_string(),
                source,
            })?;

        Ok(Self {
            http,
            forecast_url: FORECAST_URL.to_string(),
            marine_url: MARINE_URL.to_string(),
        })
    }

    /// Source with the timeout and endpoints of `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(Duration::from_secs(config.timeout_secs))?
            .with_endpoints(config.forecast_url.clone(), config.marine_url.clone()))
    }

    pub fn with_endpoints(mut self, forecast_url: String, marine_url: String) -> Self {
        self.forecast_url = forecast_url;
        self.marine_url = marine_url;
        self
    }

    pub fn endpoint(&self, family: VariableFamily) -> &str {
        match family {
            VariableFamily::Atmospheric => &self.forecast_url,
            VariableFamily::Marine => &self.marine_url,
        }
    }
}

/// Query parameters for one family. The window is expressed in 15-minute steps.
/// Models only apply to the forecast endpoint; the marine endpoint keeps its
/// own wave model.
pub fn query(request: &ForecastRequest, family: VariableFamily) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("latitude", request.latitude().to_string()),
        ("longitude", request.longitude().to_string()),
        ("timezone", request.timezone().name().to_string()),
        (MINUTELY_15, request.variables_for(family).join(",")),
        (
            "past_minutely_15",
            request.past_hours().saturating_mul(STEPS_PER_HOUR).to_string(),
        ),
        (
            "forecast_minutely_15",
            request.future_hours().saturating_mul(STEPS_PER_HOUR).to_string(),
        ),
    ];
    if family == VariableFamily::Atmospheric && !request.models().is_empty() {
        params.push(("models", request.models().join(",")));
    }
    params
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    minutely_15: Option<OmBlock>,
}

#[derive(Debug, Deserialize)]
struct OmBlock {
    time: Vec<String>,
    #[serde(flatten)]
    series: BTreeMap<String, Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
struct OmError {
    reason: String,
}

/// Decodes a 15-minute payload. Variables absent from the block are simply
/// absent from the result; anything structurally off is a payload error.
pub fn decode_payload(endpoint: &str, body: &str) -> Result<ForecastResponse> {
    let parsed: OmResponse = serde_json::from_str(body)
        .map_err(|e| SnapshotError::payload(endpoint, e.to_string()))?;

    let block = parsed
        .minutely_15
        .ok_or_else(|| SnapshotError::payload(endpoint, format!("missing '{MINUTELY_15}' block")))?;

    let times = block
        .time
        .iter()
        .map(|raw| {
            parse_timestamp(raw).ok_or_else(|| {
                SnapshotError::payload(endpoint, format!("unparsable timestamp '{raw}'"))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut response = ForecastResponse::new();
    for (name, values) in block.series {
        if values.len() != times.len() {
            return Err(SnapshotError::payload(
                endpoint,
                format!(
                    "series '{name}' has {} values for {} timestamps",
                    values.len(),
                    times.len()
                ),
            ));
        }

        let samples = times
            .iter()
            .zip(values)
            .map(|(time, value)| Sample { time: *time, value })
            .collect();
        response.insert(name, samples);
    }

    Ok(response)
}

#[async_trait]
impl ForecastSource for OpenMeteoSource {
    async fn fetch_family(
        &self,
        request: &ForecastRequest,
        family: VariableFamily,
    ) -> Result<ForecastResponse> {
        let url = self.endpoint(family);
        let params = query(request, family);
        info!(%family, %url, variables = request.variables_for(family).len(), "requesting forecast");

        let res = self
            .http
            .get(url)
            .query(&params)
            .send()
            .await
            .map_err(|source| SnapshotError::Transport {
                endpoint: url.to_string(),
                source,
            })?;

        let status = res.status();
        let body = res.text().await.map_err(|source| SnapshotError::Transport {
            endpoint: url.to_string(),
            source,
        })?;

        if !status.is_success() {
            return Err(SnapshotError::UpstreamStatus {
                endpoint: url.to_string(),
                status,
                body: upstream_reason(&body),
            });
        }

        let response = decode_payload(url, &body)?;
        debug!(
            %family,
            variables = response.variables().count(),
            timestamps = response.iter().map(|(_, s)| s.len()).max().unwrap_or(0),
            "decoded payload"
        );
        Ok(response)
    }
}

/// Open-Meteo reports failures as `{"error": true, "reason": "..."}`.
fn upstream_reason(body: &str) -> String {
    match serde_json::from_str::<OmError>(body) {
        Ok(err) => err.reason,
        Err(_) => truncate_body(body),
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
