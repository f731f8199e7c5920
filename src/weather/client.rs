//! Weather API client.
//!
//! Talks to an OpenWeatherMap-compatible API: current conditions by
//! location name and a 3-hourly forecast by coordinates.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::WeatherError;

// ---

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Current conditions at a location. Pressure is in hPa as reported.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentConditions {
    // ---
    pub temperature: f64,
    pub humidity: f64,
    pub pressure_hpa: f64,
    pub wind_speed: f64,
    pub latitude: f64,
    pub longitude: f64,
}

/// One step of the forecast.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ForecastStep {
    /// Rain in the last 3 hours, mm, when reported.
    pub rain_3h: Option<f64>,
}

/// The two weather API calls the fetcher needs.
#[async_trait]
pub trait WeatherApi: Send + Sync {
    // ---
    async fn current(&self, location: &str) -> Result<CurrentConditions, WeatherError>;

    async fn forecast(&self, latitude: f64, longitude: f64)
        -> Result<Vec<ForecastStep>, WeatherError>;
}

#[derive(Debug, Deserialize)]
struct OwmCurrentResponse {
    // ---
    coord: OwmCoord,
    main: OwmMain,
    wind: OwmWind,
}

#[derive(Debug, Deserialize)]
struct OwmCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    humidity: f64,
    pressure: f64,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwmForecastResponse {
    list: Vec<OwmForecastItem>,
}

#[derive(Debug, Deserialize)]
struct OwmForecastItem {
    rain: Option<OwmRain>,
}

#[derive(Debug, Deserialize)]
struct OwmRain {
    #[serde(rename = "3h")]
    three_hour: Option<f64>,
}

/// HTTP client for the OpenWeatherMap API.
#[derive(Clone)]
pub struct OpenWeatherClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for OpenWeatherClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenWeatherClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"****")
            .finish()
    }
}

impl OpenWeatherClient {
    // ---
    /// Build a client with a per-request timeout.
    pub fn new(
        api_key: String,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, WeatherError> {
        // ---
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, WeatherError> {
        // ---
        let url = format!("{}/{}", self.base_url, endpoint);
        tracing::debug!("Fetching {} with {:?}", url, params);

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("appid", self.api_key.as_str()), ("units", "metric")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(WeatherError::Status { status, body });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| WeatherError::Decode(e.to_string()))
    }
}

#[async_trait]
impl WeatherApi for OpenWeatherClient {
    // ---
    async fn current(&self, location: &str) -> Result<CurrentConditions, WeatherError> {
        // ---
        let data: OwmCurrentResponse = self
            .get_json("weather", &[("q", location.to_string())])
            .await?;

        Ok(CurrentConditions {
            temperature: data.main.temp,
            humidity: data.main.humidity,
            pressure_hpa: data.main.pressure,
            wind_speed: data.wind.speed,
            latitude: data.coord.lat,
            longitude: data.coord.lon,
        })
    }

    async fn forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Vec<ForecastStep>, WeatherError> {
        // ---
        let data: OwmForecastResponse = self
            .get_json(
                "forecast",
                &[("lat", latitude.to_string()), ("lon", longitude.to_string())],
            )
            .await?;

        Ok(data
            .list
            .into_iter()
            .map(|item| ForecastStep {
                rain_3h: item.rain.and_then(|r| r.three_hour),
            })
            .collect())
    }
}
