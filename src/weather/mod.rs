//! Weather data: the shared cache, the API client and fetch-on-miss.

pub mod cache;
pub mod client;
pub mod fetcher;

pub use cache::{WeatherCache, DEFAULT_TTL_SECS};
pub use client::{CurrentConditions, ForecastStep, OpenWeatherClient, WeatherApi};
pub use fetcher::{near_term_rain, WeatherFetcher};
