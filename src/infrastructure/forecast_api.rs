// Live forecasting service client
use crate::application::forecaster::Forecaster;
use crate::domain::forecast::{Forecast, ForecastOrigin, ForecastPoint};
use crate::domain::series::Series;
use crate::error::ForecastServiceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct ForecastRequest {
    series: Vec<RequestPoint>,
    horizon: usize,
    confidence_level: f64,
}

#[derive(Debug, Serialize)]
struct RequestPoint {
    timestamp: DateTime<Utc>,
    value: f64,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    points: Vec<ResponsePoint>,
}

#[derive(Debug, Deserialize)]
struct ResponsePoint {
    timestamp: DateTime<Utc>,
    point: f64,
    lower: f64,
    upper: f64,
}

pub struct ApiForecaster {
    url: String,
    auth_token: Option<String>,
    client: reqwest::Client,
}

impl ApiForecaster {
    pub fn new(url: String, auth_token: Option<String>) -> Self {
        Self {
            url,
            auth_token: auth_token.filter(|t| !t.trim().is_empty()),
            client: reqwest::Client::new(),
        }
    }

    fn build_request(series: &Series, horizon: usize, confidence_level: f64) -> ForecastRequest {
        ForecastRequest {
            series: series
                .readings()
                .iter()
                .map(|r| RequestPoint {
                    timestamp: r.timestamp,
                    value: r.voltage,
                })
                .collect(),
            horizon,
            confidence_level,
        }
    }

    /// Map and validate a service response. Interval violations are clamped
    /// and flagged per point; a short or empty response is malformed because
    /// the caller contracts for the full horizon at the series cadence.
    /// Timestamps that drift off that cadence are tolerated with a warning.
    fn map_response(
        response: ForecastResponse,
        series: &Series,
        horizon: usize,
        confidence_level: f64,
    ) -> Result<Forecast, ForecastServiceError> {
        if response.points.len() < horizon {
            return Err(ForecastServiceError::MalformedResponse(format!(
                "expected {horizon} forecast points, got {}",
                response.points.len()
            )));
        }

        let off_cadence = off_cadence_count(series, &response.points);
        if off_cadence > 0 {
            tracing::warn!(
                off_cadence,
                "forecast timestamps do not continue the series at its sampling cadence"
            );
        }

        let points: Vec<ForecastPoint> = response
            .points
            .into_iter()
            .take(horizon)
            .map(|p| {
                if !(p.point.is_finite() && p.lower.is_finite() && p.upper.is_finite()) {
                    return Err(ForecastServiceError::MalformedResponse(
                        "non-finite value in forecast point".to_string(),
                    ));
                }
                Ok(ForecastPoint::clamped(
                    p.timestamp,
                    p.point,
                    p.lower,
                    p.upper,
                    confidence_level,
                ))
            })
            .collect::<Result<_, _>>()?;

        Ok(Forecast::new(points, ForecastOrigin::Live, confidence_level))
    }
}

/// How many returned timestamps miss the expected grid (last historical
/// timestamp plus k+1 cadence steps) by more than half a step.
fn off_cadence_count(series: &Series, points: &[ResponsePoint]) -> usize {
    let Some(last) = series.last() else {
        return 0;
    };
    let cadence = series.sampling_interval();
    let tolerance = cadence / 2;

    points
        .iter()
        .enumerate()
        .filter(|(k, p)| {
            let expected = last.timestamp + cadence * (*k as i32 + 1);
            (p.timestamp - expected).abs() > tolerance
        })
        .count()
}

#[async_trait]
impl Forecaster for ApiForecaster {
    async fn forecast(
        &self,
        series: &Series,
        horizon_steps: usize,
        confidence_level: f64,
    ) -> Result<Forecast, ForecastServiceError> {
        let token = self
            .auth_token
            .as_ref()
            .ok_or(ForecastServiceError::MissingCredentials)?;

        let request = Self::build_request(series, horizon_steps, confidence_level);

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ForecastServiceError::Status(status, body));
        }

        let parsed = response
            .json::<ForecastResponse>()
            .await
            .map_err(|e| ForecastServiceError::MalformedResponse(e.to_string()))?;

        Self::map_response(parsed, series, horizon_steps, confidence_level)
    }

    fn origin(&self) -> ForecastOrigin {
        ForecastOrigin::Live
    }
}
