//! Image preprocessing
//!
//! The single transform from encoded image bytes to the model's input tensor.
//! Training, evaluation and serving all call [`preprocess_bytes`]; the file
//! variant only reads bytes and delegates, so there is exactly one code path.
//!
//! The transform decodes a PNG, converts to 8-bit grayscale, rescales the
//! full sample range to `[0, 1]`, and resizes to 64x256 with bilinear
//! interpolation. The resize ignores the source aspect ratio: every word
//! image is stretched or squeezed to the same shape.

use std::path::Path;

use image::imageops::FilterType;
use image::ImageFormat;

use crate::utils::error::{Error, Result};
use crate::{IMG_HEIGHT, IMG_WIDTH};

/// Decode PNG bytes into a normalized grayscale pixel buffer.
///
/// Returns `IMG_HEIGHT * IMG_WIDTH` f32 values in `[0, 1]`, row-major.
/// Fails with [`Error::Decode`] if the bytes are not a decodable PNG.
pub fn preprocess_bytes(bytes: &[u8]) -> Result<Vec<f32>> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|e| Error::Decode(e.to_string()))?;

    let gray = img.to_luma8();
    let resized = image::imageops::resize(
        &gray,
        IMG_WIDTH as u32,
        IMG_HEIGHT as u32,
        FilterType::Triangle,
    );

    // Full-range rescale: the scale is fixed by the 8-bit sample depth,
    // not by the min/max of the actual pixel values.
    Ok(resized.pixels().map(|p| p.0[0] as f32 / 255.0).collect())
}

/// Preprocess a stored word image.
///
/// Reads the file and routes through [`preprocess_bytes`].
pub fn preprocess_file(path: &Path) -> Result<Vec<f32>> {
    let bytes = std::fs::read(path).map_err(|e| Error::DataLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    preprocess_bytes(&bytes)
}

#[cfg(test)]
pub(crate) mod test_support {
    use image::{DynamicImage, GrayImage, ImageFormat, Luma};
    use std::io::Cursor;

    /// Encode a synthetic grayscale PNG in memory.
    ///
    /// `lit` selects which half of the image is bright, giving two trivially
    /// distinguishable "words" for pipeline tests.
    pub fn synthetic_png(width: u32, height: u32, lit_left: bool) -> Vec<u8> {
        let img = GrayImage::from_fn(width, height, |x, _y| {
            let left = x < width / 2;
            if left == lit_left {
                Luma([230u8])
            } else {
                Luma([25u8])
            }
        });

        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("in-memory png encoding");
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_shape_and_range() {
        let png = test_support::synthetic_png(120, 40, true);
        let pixels = preprocess_bytes(&png).unwrap();

        assert_eq!(pixels.len(), IMG_HEIGHT * IMG_WIDTH);
        assert!(pixels.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_deterministic() {
        let png = test_support::synthetic_png(300, 77, false);
        let a = preprocess_bytes(&png).unwrap();
        let b = preprocess_bytes(&png).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_resize_ignores_aspect_ratio() {
        // A square source still comes out 64x256
        let png = test_support::synthetic_png(50, 50, true);
        let pixels = preprocess_bytes(&png).unwrap();
        assert_eq!(pixels.len(), IMG_HEIGHT * IMG_WIDTH);
    }

    #[test]
    fn test_garbage_bytes_fail_with_decode_error() {
        let result = preprocess_bytes(b"definitely not a png");
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn test_non_png_container_rejected() {
        // Valid image bytes in a different container must not decode
        let img = image::GrayImage::from_pixel(8, 8, image::Luma([128u8]));
        let mut jpeg = Vec::new();
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut std::io::Cursor::new(&mut jpeg), ImageFormat::Jpeg)
            .unwrap();

        let result = preprocess_bytes(&jpeg);
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn test_file_and_bytes_agree() {
        let png = test_support::synthetic_png(128, 64, true);
        let path = std::env::temp_dir().join("medscript_preprocess_agree.png");
        std::fs::write(&path, &png).unwrap();

        let from_file = preprocess_file(&path).unwrap();
        let from_bytes = preprocess_bytes(&png).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(from_file, from_bytes);
    }
}
