use image::{ImageBuffer, Rgba, RgbaImage};
use tracing::info;

use crate::errors::OpendapError;

pub struct WindPngData {
    pub png_buffer: Vec<u8>,
}

/// Encode U/V fields into an RGBA PNG (`R` = normalized U, `G` = normalized V,
/// `B` = 0, `A` = 255). Rows are written in the order of `lat_values` as
/// returned by the parser (ascending, south to north) with no vertical flip;
/// consumers wanting north-up orientation must flip client-side.
#[allow(clippy::too_many_arguments)]
pub fn convert_to_png(
    width: usize,
    height: usize,
    u_data: &[f64],
    v_data: &[f64],
    u_min: f64,
    u_max: f64,
    v_min: f64,
    v_max: f64,
) -> Result<WindPngData, OpendapError> {
    info!("Creating {}x{} PNG...", width, height);

    let mut img: RgbaImage = ImageBuffer::new(width as u32, height as u32);
    let u_range = u_max - u_min;
    let v_range = v_max - v_min;

    for i in 0..u_data.len() {
        let x = (i % width) as u32;
        let y = (i / width) as u32;

        let u_norm = if u_range == 0.0 {
            0
        } else {
            ((u_data[i] - u_min) / u_range * 255.0).round() as u8
        };
        let v_norm = if v_range == 0.0 {
            0
        } else {
            ((v_data[i] - v_min) / v_range * 255.0).round() as u8
        };

        img.put_pixel(x, y, Rgba([u_norm, v_norm, 0, 255]));
    }

    let mut png_buffer = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png_buffer);

    img.write_with_encoder(encoder)
        .map_err(|e| OpendapError::EncoderUnavailable(e.to_string()))?;

    info!("PNG created: {} bytes", png_buffer.len());

    Ok(WindPngData { png_buffer })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_and_denormalize() {
        // S5: 4x2 grid.
        let u = [0.0, 5.0, -3.0, 10.0, 0.0, 0.0, 1.0, 2.0];
        let v = [-1.0, 0.0, 2.0, -4.0, 3.0, 0.0, 0.0, 5.0];
        let (u_min, u_max) = (-3.0, 10.0);
        let (v_min, v_max) = (-4.0, 5.0);

        let result = convert_to_png(4, 2, &u, &v, u_min, u_max, v_min, v_max).unwrap();

        let decoded = image::load_from_memory(&result.png_buffer).unwrap().to_rgba8();
        assert_eq!(decoded.width(), 4);
        assert_eq!(decoded.height(), 2);
        let pixel = decoded.get_pixel(3, 0);
        assert_eq!(pixel[0], 255); // R: u=10.0 -> (10 - -3)/13 * 255 = 255
        assert_eq!(pixel[1], 0); // G: v=-4.0 -> (-4 - -4)/9 * 255 = 0

        let u_decoded = u_min + pixel[0] as f64 / 255.0 * (u_max - u_min);
        assert!((u_decoded - 10.0).abs() <= (u_max - u_min) / 255.0);
    }

    #[test]
    fn test_degenerate_range_writes_zero_channel() {
        let u = [1.0, 1.0, 1.0, 1.0];
        let v = [0.0, 1.0, 2.0, 3.0];
        let result = convert_to_png(2, 2, &u, &v, 1.0, 1.0, 0.0, 3.0).unwrap();
        assert!(!result.png_buffer.is_empty());
    }
}
