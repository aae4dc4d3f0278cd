use chrono::{Datelike, Timelike, Utc};
use tracing::{error, info};

use crate::errors::OpendapError;
use crate::models::{PrecipitationPoint, WindMetadata, WindPoint};
use crate::utils::opendap_parser::{parse_opendap_ascii, parse_opendap_precipitation_ascii};
use crate::utils::png_converter::convert_to_png;

const BASE_URL: &str = "https://nomads.ncep.noaa.gov/dods/gfs_0p50/gfs";

#[derive(Debug, Clone)]
pub struct SelectedRun {
    pub date: String, // YYYYMMDD
    pub hour: String, // HH (00, 06, 12, 18)
}

impl SelectedRun {
    pub fn run_name(&self) -> String {
        format!("{}_{}Z", self.date, self.hour)
    }
}

/// Select the single GFS cycle `run_age` hours back, per the deterministic
/// formula: `cycle = floor((utc_hour_now - run_age + 24) mod 24 / 6) * 6`,
/// with the date taken from the cycle boundary. There is no fallback across
/// candidate runs; a fetch failure for this run fails the target outright.
pub fn select_run(run_age: i64) -> SelectedRun {
    let target_time = Utc::now() - chrono::Duration::hours(run_age);
    let cycle_hour = (target_time.hour() / 6) * 6;

    let full_date = target_time
        .with_hour(cycle_hour)
        .unwrap()
        .with_minute(0)
        .unwrap()
        .with_second(0)
        .unwrap()
        .with_nanosecond(0)
        .unwrap();

    SelectedRun {
        date: format!("{:04}{:02}{:02}", full_date.year(), full_date.month(), full_date.day()),
        hour: format!("{:02}", cycle_hour),
    }
}

#[derive(Debug, Clone)]
pub struct DownloadedWindData {
    pub png_buffer: Vec<u8>,
    pub metadata: WindMetadata,
    pub wind_points: Vec<WindPoint>,
}

#[derive(Debug, Clone)]
pub struct DownloadedPrecipitationData {
    pub precip_points: Vec<PrecipitationPoint>,
}

async fn fetch_ascii(url: &str) -> Result<String, OpendapError> {
    let client = reqwest::Client::new();
    let response = client
        .get(url)
        .timeout(std::time::Duration::from_secs(30))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(OpendapError::UpstreamHttp {
            status: response.status().as_u16(),
        });
    }

    let body = response.text().await?;

    if body.trim().starts_with('<') || body.contains("<!DOCTYPE") || body.contains("<html") {
        return Err(OpendapError::UpstreamNotReady {
            message: extract_opendap_error(&body),
        });
    }

    Ok(body)
}

/// Fetch and decode a GFS wind grid for `forecast_offset` hours into the run
/// selected by `run_age`, splitting the request across the antimeridian when
/// `lon_min < 0`.
pub async fn download_wind_data_opendap(
    forecast_offset: i32,
    run_age: i64,
    lat_min: f64,
    lat_max: f64,
    lon_min: f64,
    lon_max: f64,
) -> Result<DownloadedWindData, OpendapError> {
    let run = select_run(run_age);
    let base_url = format!("{BASE_URL}{}/gfs_0p50_{}z", run.date, run.hour);

    let lat_start = ((lat_min + 90.0) / 0.5).floor() as i32;
    let lat_end = ((lat_max + 90.0) / 0.5).floor() as i32;
    let needs_wrap = lon_min < 0.0;

    let (all_lat_values, all_lon_values, all_u_values, all_v_values) = if needs_wrap {
        info!("wind: handling longitude wraparound with two requests...");

        let west_constraint = wind_constraint(forecast_offset, lat_start, lat_end, lon_start_west(lon_min), 719);
        let east_constraint = wind_constraint(forecast_offset, lat_start, lat_end, 0, (lon_max / 0.5).floor() as i32);

        let west_ascii = fetch_ascii(&format!("{base_url}{west_constraint}")).await?;
        let west_data = parse_opendap_ascii(&west_ascii)?;
        let west_lons: Vec<f64> = west_data.lon_values.iter().map(|lon| lon - 360.0).collect();

        let east_ascii = fetch_ascii(&format!("{base_url}{east_constraint}")).await?;
        let east_data = parse_opendap_ascii(&east_ascii)?;

        let all_lat_values = west_data.lat_values.clone();
        let west_lon_count = west_data.lon_values.len();
        let east_lon_count = east_data.lon_values.len();
        let all_lon_values = [west_lons, east_data.lon_values].concat();

        let mut all_u_values = Vec::new();
        let mut all_v_values = Vec::new();

        for lat_idx in 0..all_lat_values.len() {
            let west_row_start = lat_idx * west_lon_count;
            let east_row_start = lat_idx * east_lon_count;

            all_u_values.extend_from_slice(&west_data.u_data[west_row_start..west_row_start + west_lon_count]);
            all_v_values.extend_from_slice(&west_data.v_data[west_row_start..west_row_start + west_lon_count]);
            all_u_values.extend_from_slice(&east_data.u_data[east_row_start..east_row_start + east_lon_count]);
            all_v_values.extend_from_slice(&east_data.v_data[east_row_start..east_row_start + east_lon_count]);
        }

        (all_lat_values, all_lon_values, all_u_values, all_v_values)
    } else {
        let lon_start = (lon_min / 0.5).floor() as i32;
        let lon_end = (lon_max / 0.5).floor() as i32;
        let constraint = wind_constraint(forecast_offset, lat_start, lat_end, lon_start, lon_end);

        let ascii = fetch_ascii(&format!("{base_url}{constraint}")).await?;
        let parsed = parse_opendap_ascii(&ascii)?;

        (parsed.lat_values, parsed.lon_values, parsed.u_data, parsed.v_data)
    };

    let width = all_lon_values.len();
    let height = all_lat_values.len();

    if width == 0 || height == 0 || all_u_values.is_empty() {
        return Err(OpendapError::Parse(format!(
            "invalid parsed grid: width={width}, height={height}, u={}",
            all_u_values.len()
        )));
    }

    let u_min = all_u_values.iter().cloned().fold(f64::INFINITY, f64::min);
    let u_max = all_u_values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let v_min = all_v_values.iter().cloned().fold(f64::INFINITY, f64::min);
    let v_max = all_v_values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    // PNG encoding is optional: a failure here must not drop the point-level
    // data, so fall back to an empty buffer rather than propagating.
    let png_buffer = match convert_to_png(width, height, &all_u_values, &all_v_values, u_min, u_max, v_min, v_max) {
        Ok(png) => png.png_buffer,
        Err(e) => {
            error!("wind: PNG encoding failed, serving points without a tile: {}", e);
            Vec::new()
        }
    };

    let mut wind_points = Vec::with_capacity(width * height);
    #[allow(clippy::needless_range_loop)]
    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            wind_points.push(WindPoint::new(
                all_lat_values[y],
                all_lon_values[x],
                all_u_values[idx],
                all_v_values[idx],
            ));
        }
    }

    let metadata = WindMetadata {
        source: "NOAA GFS 0.5° via OpenDAP".to_string(),
        date: Utc::now().to_rfc3339(),
        width,
        height,
        u_min,
        u_max,
        v_min,
        v_max,
    };

    Ok(DownloadedWindData {
        png_buffer,
        metadata,
        wind_points,
    })
}

fn lon_start_west(lon_min: f64) -> i32 {
    ((360.0 + lon_min) / 0.5).floor() as i32
}

fn wind_constraint(forecast_offset: i32, lat_start: i32, lat_end: i32, lon_start: i32, lon_end: i32) -> String {
    format!(
        ".ascii?ugrd10m[{forecast_offset}:1:{forecast_offset}][{lat_start}:1:{lat_end}][{lon_start}:1:{lon_end}],\
         vgrd10m[{forecast_offset}:1:{forecast_offset}][{lat_start}:1:{lat_end}][{lon_start}:1:{lon_end}],\
         lat[{lat_start}:1:{lat_end}],lon[{lon_start}:{lon_end}]"
    )
}

fn precip_constraint(forecast_offset: i32, lat_start: i32, lat_end: i32, lon_start: i32, lon_end: i32) -> String {
    format!(
        ".ascii?apcpsfc[{forecast_offset}:1:{forecast_offset}][{lat_start}:1:{lat_end}][{lon_start}:1:{lon_end}],\
         lat[{lat_start}:1:{lat_end}],lon[{lon_start}:{lon_end}]"
    )
}

/// Fetch and decode a GFS precipitation grid, mirroring `download_wind_data_opendap`.
pub async fn download_precipitation_data_opendap(
    forecast_offset: i32,
    run_age: i64,
    lat_min: f64,
    lat_max: f64,
    lon_min: f64,
    lon_max: f64,
) -> Result<DownloadedPrecipitationData, OpendapError> {
    let run = select_run(run_age);
    let base_url = format!("{BASE_URL}{}/gfs_0p50_{}z", run.date, run.hour);

    let lat_start = ((lat_min + 90.0) / 0.5).floor() as i32;
    let lat_end = ((lat_max + 90.0) / 0.5).floor() as i32;
    let needs_wrap = lon_min < 0.0;

    let (all_lat_values, all_lon_values, all_precip_values) = if needs_wrap {
        info!("precipitation: handling longitude wraparound with two requests...");

        let west_constraint = precip_constraint(forecast_offset, lat_start, lat_end, lon_start_west(lon_min), 719);
        let west_ascii = fetch_ascii(&format!("{base_url}{west_constraint}")).await?;
        let west_data = parse_opendap_precipitation_ascii(&west_ascii)?;
        let west_lons: Vec<f64> = west_data.lon_values.iter().map(|lon| lon - 360.0).collect();

        let east_constraint = precip_constraint(forecast_offset, lat_start, lat_end, 0, (lon_max / 0.5).floor() as i32);
        let east_ascii = fetch_ascii(&format!("{base_url}{east_constraint}")).await?;
        let east_data = parse_opendap_precipitation_ascii(&east_ascii)?;

        let all_lat_values = west_data.lat_values.clone();
        let west_lon_count = west_data.lon_values.len();
        let east_lon_count = east_data.lon_values.len();
        let all_lon_values = [west_lons, east_data.lon_values].concat();

        let mut all_precip_values = Vec::new();
        for lat_idx in 0..all_lat_values.len() {
            let west_row_start = lat_idx * west_lon_count;
            let east_row_start = lat_idx * east_lon_count;
            all_precip_values
                .extend_from_slice(&west_data.precip_data[west_row_start..west_row_start + west_lon_count]);
            all_precip_values
                .extend_from_slice(&east_data.precip_data[east_row_start..east_row_start + east_lon_count]);
        }

        (all_lat_values, all_lon_values, all_precip_values)
    } else {
        let lon_start = (lon_min / 0.5).floor() as i32;
        let lon_end = (lon_max / 0.5).floor() as i32;
        let constraint = precip_constraint(forecast_offset, lat_start, lat_end, lon_start, lon_end);

        let ascii = fetch_ascii(&format!("{base_url}{constraint}")).await?;
        let parsed = parse_opendap_precipitation_ascii(&ascii)?;

        (parsed.lat_values, parsed.lon_values, parsed.precip_data)
    };

    let width = all_lon_values.len();
    let height = all_lat_values.len();
    let mut precip_points = Vec::with_capacity(width * height);

    #[allow(clippy::needless_range_loop)]
    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            precip_points.push(PrecipitationPoint::new(
                all_lat_values[y],
                all_lon_values[x],
                all_precip_values[idx],
            ));
        }
    }

    Ok(DownloadedPrecipitationData { precip_points })
}

/// Extract the dataset-not-available message from an OpenDAP HTML error page.
fn extract_opendap_error(html: &str) -> String {
    if let Some(start) = html.find("<b>") {
        if let Some(end) = html[start..].find("</b>") {
            let error_text = &html[start + 3..start + end];
            if error_text.contains("is not an available dataset") {
                return error_text.to_string();
            }
        }
    }
    "Unknown OpenDAP error".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_run_floors_to_six_hour_cycle() {
        let run = select_run(0);
        let hour: u32 = run.hour.parse().unwrap();
        assert_eq!(hour % 6, 0);
        assert!(hour <= 23);
    }

    #[test]
    fn test_wind_constraint_shape() {
        let c = wind_constraint(3, 250, 322, 0, 90);
        assert!(c.starts_with(".ascii?ugrd10m[3:1:3][250:1:322][0:1:90]"));
        assert!(c.contains("vgrd10m[3:1:3][250:1:322][0:1:90]"));
        assert!(c.contains("lat[250:1:322]"));
        assert!(c.contains("lon[0:90]"));
    }

    #[test]
    fn test_longitude_requests_wraparound_split() {
        // S1: (lon_min, lon_max) = (-10, 45)
        let west = wind_constraint(0, 250, 322, lon_start_west(-10.0), 719);
        let east = wind_constraint(0, 250, 322, 0, (45.0_f64 / 0.5).floor() as i32);
        assert!(west.contains("lon[700:719]"));
        assert!(east.contains("lon[0:90]"));
    }
}
