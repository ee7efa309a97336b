//! Image preprocessing.
//!
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use image::RgbImage;
use ndarray::Array4;

/// Side length of the square model input.
pub const INPUT_SIZE: usize = 224;
/// Number of color channels of the model input.
pub const INPUT_CHANNELS: usize = 3;

/// Decode a base64 image and turn it into a `(1, 224, 224, 3)` array scaled to `[0, 1]`.
///
/// `_width` and `_height` describe the frame the client captured. The model input size is
/// fixed, so they do not influence the result.
pub fn preprocess(image_data: &str, _width: u32, _height: u32) -> Result<Array4<f32>> {
    let image_bytes = STANDARD
        .decode(strip_data_url(image_data).trim())
        .context("invalid base64 image data")?;
    let image = image::load_from_memory(&image_bytes)
        .context("failed to decode image")?
        .to_rgb8();

    Ok(to_input_array(&image))
}

/// Drop a `data:image/...;base64,` prefix as sent by browsers.
fn strip_data_url(image_data: &str) -> &str {
    match image_data.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map_or(rest, |(_, payload)| payload),
        None => image_data,
    }
}

fn to_input_array(image: &RgbImage) -> Array4<f32> {
    let resized: RgbImage = image::imageops::resize(
        image,
        INPUT_SIZE as u32,
        INPUT_SIZE as u32,
        image::imageops::FilterType::Triangle,
    );

    Array4::from_shape_fn(
        (1, INPUT_SIZE, INPUT_SIZE, INPUT_CHANNELS),
        |(_, y, x, c)| resized[(x as _, y as _)][c] as f32 / 255.0,
    )
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use image::{DynamicImage, GrayImage, ImageOutputFormat, Luma, Rgb};

    use super::*;

    fn encode_png(image: DynamicImage) -> Result<String> {
        let mut buf = Cursor::new(vec![]);
        image.write_to(&mut buf, ImageOutputFormat::Png)?;
        Ok(STANDARD.encode(buf.into_inner()))
    }

    #[test]
    fn test_square_rgb_image() -> Result<()> {
        for size in [7, 224, 500] {
            let image = RgbImage::from_fn(size, size, |x, y| {
                Rgb([(x % 256) as u8, (y % 256) as u8, 255])
            });
            let input = preprocess(&encode_png(DynamicImage::ImageRgb8(image))?, 640, 480)?;

            assert_eq!(input.shape(), &[1, 224, 224, 3]);
            assert!(input.iter().all(|v| (0.0..=1.0).contains(v)));
            assert_eq!(input[[0, 0, 0, 2]], 1.0);
        }

        Ok(())
    }

    #[test]
    fn test_grayscale_converted_to_rgb() -> Result<()> {
        let image = GrayImage::from_pixel(32, 16, Luma([51]));
        let input = preprocess(&encode_png(DynamicImage::ImageLuma8(image))?, 32, 16)?;

        assert_eq!(input.shape(), &[1, 224, 224, 3]);
        assert!(input.iter().all(|v| (v - 0.2).abs() < 1e-6));

        Ok(())
    }

    #[test]
    fn test_data_url_prefix() -> Result<()> {
        let image = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        let data = format!(
            "data:image/png;base64,{}",
            encode_png(DynamicImage::ImageRgb8(image))?
        );

        let input = preprocess(&data, 10, 10)?;
        assert!(input.iter().all(|v| *v == 0.0));

        Ok(())
    }

    #[test]
    fn test_invalid_input() {
        assert!(preprocess("not base64!", 640, 480).is_err());
        assert!(preprocess(&STANDARD.encode(b"definitely not an image"), 640, 480).is_err());
    }
}
