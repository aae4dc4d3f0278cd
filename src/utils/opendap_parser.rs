use tracing::info;

use crate::errors::OpendapError;

#[derive(Debug, Clone)]
pub struct ParsedWindData {
    pub lat_values: Vec<f64>,
    pub lon_values: Vec<f64>,
    pub u_data: Vec<f64>,
    pub v_data: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct ParsedPrecipitationData {
    pub lat_values: Vec<f64>,
    pub lon_values: Vec<f64>,
    pub precip_data: Vec<f64>,
}

/// Parse an OpenDAP `.ascii` response carrying `ugrd10m`/`vgrd10m`/`lat`/`lon`.
///
/// OpenDAP repeats the `lat`/`lon` variable declarations; only the first
/// occurrence of each is kept; subsequent ones are skipped.
pub fn parse_opendap_ascii(ascii_data: &str) -> Result<ParsedWindData, OpendapError> {
    let mut lat_values = Vec::new();
    let mut lon_values = Vec::new();
    let mut u_values = Vec::new();
    let mut v_values = Vec::new();

    let mut current_variable: Option<&str> = None;
    let mut in_data_section = false;

    let mut parsed_lat = false;
    let mut parsed_lon = false;
    let mut parsed_ugrd = false;
    let mut parsed_vgrd = false;

    for line in ascii_data.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("lat,") || trimmed.starts_with("lat[") {
            if !parsed_lat {
                current_variable = Some("lat");
                in_data_section = true;
                parsed_lat = true;
            } else {
                current_variable = None;
                in_data_section = false;
            }
            continue;
        }

        if trimmed.starts_with("lon,") || trimmed.starts_with("lon[") {
            if !parsed_lon {
                current_variable = Some("lon");
                in_data_section = true;
                parsed_lon = true;
            } else {
                current_variable = None;
                in_data_section = false;
            }
            continue;
        }

        if trimmed.starts_with("ugrd10m,") {
            if !parsed_ugrd {
                current_variable = Some("ugrd");
                in_data_section = false; // 3-D array: wait for [index] lines
                parsed_ugrd = true;
            } else {
                current_variable = None;
                in_data_section = false;
            }
            continue;
        }

        if trimmed.starts_with("vgrd10m,") {
            if !parsed_vgrd {
                current_variable = Some("vgrd");
                in_data_section = false;
                parsed_vgrd = true;
            } else {
                current_variable = None;
                in_data_section = false;
            }
            continue;
        }

        if trimmed.starts_with("time,") || trimmed.starts_with("time[") {
            current_variable = None;
            in_data_section = false;
            continue;
        }

        if trimmed.is_empty() {
            continue;
        }

        // A letter-prefixed identifier always closes the prior variable; a
        // bracket-prefixed row belongs to the current 3-D variable.
        if trimmed.starts_with('[') {
            in_data_section = true;
            let nums = extract_numbers_from_indexed_line(trimmed);

            match current_variable {
                Some("ugrd") => u_values.extend(nums),
                Some("vgrd") => v_values.extend(nums),
                _ => {}
            }
            continue;
        }

        if in_data_section && !trimmed.chars().next().is_some_and(|c| c.is_alphabetic()) {
            let nums = extract_numbers(trimmed);

            match current_variable {
                Some("lat") => lat_values.extend(nums),
                Some("lon") => lon_values.extend(nums),
                Some("ugrd") => u_values.extend(nums),
                Some("vgrd") => v_values.extend(nums),
                _ => {}
            }
        }
    }

    info!(
        "Parsed: {} lats, {} lons, {} U values, {} V values",
        lat_values.len(),
        lon_values.len(),
        u_values.len(),
        v_values.len()
    );

    if lat_values.is_empty() || lon_values.is_empty() || u_values.is_empty() || v_values.is_empty() {
        return Err(OpendapError::Parse(format!(
            "no data: lats={}, lons={}, u={}, v={}",
            lat_values.len(),
            lon_values.len(),
            u_values.len(),
            v_values.len()
        )));
    }

    Ok(ParsedWindData {
        lat_values,
        lon_values,
        u_data: u_values,
        v_data: v_values,
    })
}

/// Parse an OpenDAP `.ascii` response carrying `apcpsfc`/`lat`/`lon`.
pub fn parse_opendap_precipitation_ascii(
    ascii_data: &str,
) -> Result<ParsedPrecipitationData, OpendapError> {
    let mut lat_values = Vec::new();
    let mut lon_values = Vec::new();
    let mut precip_values = Vec::new();

    let mut current_variable: Option<&str> = None;
    let mut in_data_section = false;

    let mut parsed_lat = false;
    let mut parsed_lon = false;
    let mut parsed_precip = false;

    for line in ascii_data.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("lat,") || trimmed.starts_with("lat[") {
            if !parsed_lat {
                current_variable = Some("lat");
                in_data_section = true;
                parsed_lat = true;
            } else {
                current_variable = None;
                in_data_section = false;
            }
            continue;
        }

        if trimmed.starts_with("lon,") || trimmed.starts_with("lon[") {
            if !parsed_lon {
                current_variable = Some("lon");
                in_data_section = true;
                parsed_lon = true;
            } else {
                current_variable = None;
                in_data_section = false;
            }
            continue;
        }

        if trimmed.starts_with("apcpsfc,") {
            if !parsed_precip {
                current_variable = Some("precip");
                in_data_section = false;
                parsed_precip = true;
            } else {
                current_variable = None;
                in_data_section = false;
            }
            continue;
        }

        if trimmed.starts_with("time,") || trimmed.starts_with("time[") {
            current_variable = None;
            in_data_section = false;
            continue;
        }

        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with('[') {
            in_data_section = true;
            let nums = extract_numbers_from_indexed_line(trimmed);

            if matches!(current_variable, Some("precip")) {
                precip_values.extend(nums);
            }
            continue;
        }

        if in_data_section && !trimmed.chars().next().is_some_and(|c| c.is_alphabetic()) {
            let nums = extract_numbers(trimmed);

            match current_variable {
                Some("lat") => lat_values.extend(nums),
                Some("lon") => lon_values.extend(nums),
                Some("precip") => precip_values.extend(nums),
                _ => {}
            }
        }
    }

    info!(
        "Parsed precipitation: {} lats, {} lons, {} precip values",
        lat_values.len(),
        lon_values.len(),
        precip_values.len()
    );

    if lat_values.is_empty() || lon_values.is_empty() || precip_values.is_empty() {
        return Err(OpendapError::Parse(format!(
            "no data: lats={}, lons={}, precip={}",
            lat_values.len(),
            lon_values.len(),
            precip_values.len()
        )));
    }

    Ok(ParsedPrecipitationData {
        lat_values,
        lon_values,
        precip_data: precip_values,
    })
}

/// Extract numbers from a line starting with `[index][index]`.
fn extract_numbers_from_indexed_line(line: &str) -> Vec<f64> {
    let without_prefix = line
        .split_once(']')
        .and_then(|(_, rest)| rest.trim_start_matches(',').trim().split_once(']'))
        .map(|(_, rest)| rest.trim_start_matches(',').trim())
        .unwrap_or(line);

    extract_numbers(without_prefix)
}

fn extract_numbers(text: &str) -> Vec<f64> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_numbers() {
        let nums = extract_numbers("1.5, 2.3, 3.7");
        assert_eq!(nums, vec![1.5, 2.3, 3.7]);

        let nums = extract_numbers("  4.2   5.1  ");
        assert_eq!(nums, vec![4.2, 5.1]);
    }

    #[test]
    fn test_extract_numbers_from_indexed_line() {
        let nums = extract_numbers_from_indexed_line("[0][0], 17.16, 17.22, 17.28");
        assert_eq!(nums, vec![17.16, 17.22, 17.28]);
    }

    #[test]
    fn test_parse_skips_duplicate_lat_lon_declarations() {
        let ascii = "lat, [2]\n35.0, 35.5\n\
                     lat, [2]\n999.0, 999.5\n\
                     lon, [2]\n-10.0, -9.5\n\
                     lon, [2]\n888.0, 888.5\n\
                     ugrd10m, [1][2][2]\n\
                     [0][0], 1.0, 2.0\n\
                     [0][1], 3.0, 4.0\n\
                     vgrd10m, [1][2][2]\n\
                     [0][0], -1.0, -2.0\n\
                     [0][1], -3.0, -4.0\n";

        let parsed = parse_opendap_ascii(ascii).unwrap();
        assert_eq!(parsed.lat_values, vec![35.0, 35.5]);
        assert_eq!(parsed.lon_values, vec![-10.0, -9.5]);
    }

    #[test]
    fn test_parse_opendap_ascii_happy_path() {
        let ascii = "lat, [2]\n35.0, 35.5\n\
                     lon, [2]\n-10.0, -9.5\n\
                     ugrd10m, [1][2][2]\n\
                     [0][0], 1.0, 2.0\n\
                     [0][1], 3.0, 4.0\n\
                     vgrd10m, [1][2][2]\n\
                     [0][0], -1.0, -2.0\n\
                     [0][1], -3.0, -4.0\n";

        let parsed = parse_opendap_ascii(ascii).unwrap();
        assert_eq!(parsed.lat_values, vec![35.0, 35.5]);
        assert_eq!(parsed.lon_values, vec![-10.0, -9.5]);
        assert_eq!(parsed.u_data, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(parsed.v_data, vec![-1.0, -2.0, -3.0, -4.0]);
    }

    #[test]
    fn test_parse_opendap_ascii_empty_is_error() {
        let err = parse_opendap_ascii("").unwrap_err();
        assert!(matches!(err, OpendapError::Parse(_)));
    }
}
