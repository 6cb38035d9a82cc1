//! Input preprocessing for CLIP encoders

use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageReader};
use ndarray::Array4;
use std::io::Cursor;

use crate::error::ModelError;

/// Side length of the square vision encoder input
pub const CLIP_IMAGE_SIZE: u32 = 224;

/// Maximum text context length, including start and end tokens
pub const CLIP_CONTEXT_LENGTH: usize = 77;

/// CLIP normalization mean values
pub const MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];

/// CLIP normalization std values
pub const STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

/// Decode image bytes, sniffing the format from the data itself
pub fn decode_image(bytes: &[u8], content_type: Option<&str>) -> Result<DynamicImage, ModelError> {
    let undecodable = |reason: String| ModelError::UndecodableImage {
        content_type: content_type.unwrap_or("unknown content type").to_string(),
        reason,
    };

    if bytes.is_empty() {
        return Err(undecodable("no image data".to_string()));
    }

    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| undecodable(e.to_string()))?
        .decode()
        .map_err(|e| undecodable(e.to_string()))
}

/// Resize the shortest edge to `size` with bicubic filtering, then centre-crop
pub fn resize_and_center_crop(image: &DynamicImage, size: u32) -> DynamicImage {
    let (w, h) = image.dimensions();
    let scale = size as f32 / w.min(h).max(1) as f32;

    let new_w = ((w as f32 * scale).round() as u32).max(size);
    let new_h = ((h as f32 * scale).round() as u32).max(size);

    let resized = image.resize_exact(new_w, new_h, FilterType::CatmullRom);
    let x = (new_w - size) / 2;
    let y = (new_h - size) / 2;
    resized.crop_imm(x, y, size, size)
}

/// Build the `[1, 3, 224, 224]` pixel tensor the vision encoder expects
pub fn image_to_tensor(image: &DynamicImage) -> Array4<f32> {
    let cropped = resize_and_center_crop(image, CLIP_IMAGE_SIZE);
    let rgb = cropped.to_rgb8();

    let size = CLIP_IMAGE_SIZE as usize;
    let mut tensor = Array4::zeros((1, 3, size, size));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] =
                (pixel[c] as f32 / 255.0 - MEAN[c]) / STD[c];
        }
    }
    tensor
}

/// Truncate token ids to the context length, keeping the final end token
pub fn truncate_ids(mut ids: Vec<i64>) -> Vec<i64> {
    if ids.len() > CLIP_CONTEXT_LENGTH {
        let end = ids[ids.len() - 1];
        ids.truncate(CLIP_CONTEXT_LENGTH - 1);
        ids.push(end);
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 30, 90])));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let img = decode_image(&png(10, 6), Some("image/png")).unwrap();
        assert_eq!(img.dimensions(), (10, 6));
    }

    #[test]
    fn test_decode_ignores_wrong_content_type() {
        assert!(decode_image(&png(4, 4), Some("application/octet-stream")).is_ok());
    }

    #[test]
    fn test_decode_html_fails_with_content_type() {
        let err = decode_image(b"<html><body>Not found</body></html>", Some("text/html")).unwrap_err();
        match err {
            ModelError::UndecodableImage { content_type, .. } => assert_eq!(content_type, "text/html"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decode_empty_fails() {
        assert!(matches!(
            decode_image(&[], None),
            Err(ModelError::UndecodableImage { .. })
        ));
    }

    #[test]
    fn test_resize_and_center_crop_shapes() {
        let wide = DynamicImage::ImageRgb8(RgbImage::new(640, 300));
        assert_eq!(resize_and_center_crop(&wide, 224).dimensions(), (224, 224));

        let tiny = DynamicImage::ImageRgb8(RgbImage::new(3, 5));
        assert_eq!(resize_and_center_crop(&tiny, 224).dimensions(), (224, 224));
    }

    #[test]
    fn test_image_to_tensor_normalizes() {
        let white = DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 300, Rgb([255, 255, 255])));
        let tensor = image_to_tensor(&white);
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
        for c in 0..3 {
            let expected = (1.0 - MEAN[c]) / STD[c];
            assert!((tensor[[0, c, 100, 100]] - expected).abs() < 1e-4);
        }
    }

    #[test]
    fn test_truncate_ids() {
        let short = vec![49406, 1, 2, 49407];
        assert_eq!(truncate_ids(short.clone()), short);

        let mut long = vec![49406];
        long.extend(std::iter::repeat(7).take(200));
        long.push(49407);
        let truncated = truncate_ids(long);
        assert_eq!(truncated.len(), CLIP_CONTEXT_LENGTH);
        assert_eq!(truncated[0], 49406);
        assert_eq!(*truncated.last().unwrap(), 49407);
    }
}
