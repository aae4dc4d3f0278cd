use serde::{Deserialize, Serialize};

/// One sampled grid point with the quantities derived from its (u, v) vector.
///
/// `direction` is the math angle of the vector (`atan2(v, u)` in degrees), not the
/// meteorological "wind is coming from" bearing — see DESIGN.md.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WindPoint {
    pub lat: f64,
    pub lon: f64,
    pub u: f64,
    pub v: f64,
    pub speed: f64,
    pub direction: f64,
    pub gusts: f64,
}

impl WindPoint {
    pub fn new(lat: f64, lon: f64, u: f64, v: f64) -> Self {
        let speed = (u * u + v * v).sqrt();
        let direction = v.atan2(u) * 180.0 / std::f64::consts::PI;

        Self {
            lat: round2(lat),
            lon: round2(lon),
            u: round2(u),
            v: round2(v),
            speed: round1(speed),
            direction: direction.round(),
            gusts: 0.0, // reserved; not available from NOAA GFS 10m wind fields
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
pub struct WindBounds {
    pub lat: [f64; 2],
    pub lon: [f64; 2],
}

/// The artifact written to `wind:points` (and its versioned copies).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindPayload {
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
    pub bounds: WindBounds,
    pub points: Vec<WindPoint>,
    pub region: String,
}

/// Metadata describing a PNG tile, sufficient to denormalize its R/G channels
/// back into m/s. This is the entity stored under `wind:metadata`; the HTTP
/// facade augments a served copy with a `tiles` array (see `routes::windgl`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindMetadata {
    pub source: String,
    pub date: String,
    pub width: usize,
    pub height: usize,
    #[serde(rename = "uMin")]
    pub u_min: f64,
    #[serde(rename = "uMax")]
    pub u_max: f64,
    #[serde(rename = "vMin")]
    pub v_min: f64,
    #[serde(rename = "vMax")]
    pub v_max: f64,
}
