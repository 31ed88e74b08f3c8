use crate::{
    Config, ForecastRequest, ForecastResponse,
    error::Result,
    model::VariableFamily,
    provider::open_meteo::OpenMeteoSource,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod open_meteo;

/// An upstream service able to answer a [`ForecastRequest`] one variable
/// family at a time.
#[async_trait]
pub trait ForecastSource: Send + Sync + Debug {
    /// Fetches the requested variables of a single family. One outbound call,
    /// no retry.
    async fn fetch_family(
        &self,
        request: &ForecastRequest,
        family: VariableFamily,
    ) -> Result<ForecastResponse>;

    /// Fetches every family concurrently and unions the results. Families
    /// with nothing requested are skipped without a network call.
    async fn fetch(&self, request: &ForecastRequest) -> Result<ForecastResponse> {
        let (atmospheric, marine) = tokio::try_join!(
            fetch_if_requested(self, request, VariableFamily::Atmospheric),
            fetch_if_requested(self, request, VariableFamily::Marine),
        )?;

        // Joined in a fixed order so completion order never matters.
        let mut response = atmospheric;
        response.merge(marine);
        Ok(response)
    }
}

async fn fetch_if_requested<S>(
    source: &S,
    request: &ForecastRequest,
    family: VariableFamily,
) -> Result<ForecastResponse>
where
    S: ForecastSource + ?Sized,
{
    if request.variables_for(family).is_empty() {
        tracing::debug!(%family, "no variables requested, skipping");
        return Ok(ForecastResponse::new());
    }
    source.fetch_family(request, family).await
}

/// Construct the Open-Meteo source described by the configuration.
pub fn source_from_config(config: &Config) -> Result<Box<dyn ForecastSource>> {
    Ok(Box::new(OpenMeteoSource::from_config(config)?))
}
