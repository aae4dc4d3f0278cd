use serde::{Deserialize, Serialize};

/// A sampled precipitation point. `precip` is the raw `apcpsfc` accumulation in
/// kg/m^2 over the grid's 3-hourly accumulation window, which is numerically
/// equal to mm over the same window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PrecipitationPoint {
    pub lat: f64,
    pub lon: f64,
    pub precip: f64,
}

impl PrecipitationPoint {
    pub fn new(lat: f64, lon: f64, precip: f64) -> Self {
        Self {
            lat: round2(lat),
            lon: round2(lon),
            precip: round1(precip),
        }
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PrecipitationBounds {
    pub lat: [f64; 2],
    pub lon: [f64; 2],
}

/// The artifact written to `precipitation:points` (and its versioned copies).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecipitationPayload {
    pub timestamp: String,
    #[serde(rename = "runName")]
    pub run_name: String,
    #[serde(rename = "forecastOffset")]
    pub forecast_offset: i64,
    #[serde(rename = "runAge")]
    pub run_age: i64,
    #[serde(rename = "dataTime")]
    pub data_time: String,
    #[serde(rename = "hoursBack")]
    pub hours_back: i64,
    pub source: String,
    pub resolution: f64,
    pub bounds: PrecipitationBounds,
    pub points: Vec<PrecipitationPoint>,
    pub region: String,
    pub unit: String,
}
