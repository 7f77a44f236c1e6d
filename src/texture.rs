use crate::error::Result;
use image::{ImageFormat, Rgba, RgbaImage, imageops};
use std::hash::Hasher;
use std::io::Cursor;
use twox_hash::XxHash64;

/// Side length of the layer-split texture.
pub const LAYER_SPLIT_SIZE: u32 = 256;

pub fn decode_png(bytes: &[u8]) -> Result<RgbaImage> {
    Ok(image::load_from_memory_with_format(bytes, ImageFormat::Png)?.to_rgba8())
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

#[inline(always)]
fn column_is_clear(image: &RgbaImage, x: u32) -> bool {
    (0..image.height()).all(|y| image.get_pixel(x, y)[3] == 0)
}

/// Width up to and including the rightmost column with any visible pixel.
/// Zero for a fully transparent image.
pub fn effective_width(image: &RgbaImage) -> u32 {
    (0..image.width())
        .rev()
        .find(|&x| !column_is_clear(image, x))
        .map_or(0, |x| x + 1)
}

/// A transparent `size`×`size` canvas with `image` copied to its top-left corner.
/// Pixels beyond the canvas are cropped.
pub fn square_canvas(image: &RgbaImage, size: u32) -> RgbaImage {
    let mut canvas = RgbaImage::new(size, size);
    imageops::replace(&mut canvas, image, 0, 0);
    canvas
}

#[inline(always)]
pub fn is_square(image: &RgbaImage, size: u32) -> bool {
    image.width() == size && image.height() == size
}

/// Fully transparent except one barely visible pixel in the top-right
/// corner, so the client does not discard the glyph as empty.
pub fn layer_split_image() -> RgbaImage {
    let mut image = RgbaImage::new(LAYER_SPLIT_SIZE, LAYER_SPLIT_SIZE);
    image.put_pixel(LAYER_SPLIT_SIZE - 1, 0, Rgba([0, 0, 0, 0x11]));
    image
}

/// Stable content hash of the pixels and dimensions, as 16 hex digits.
pub fn content_hash(image: &RgbaImage) -> String {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write_u32(image.width());
    hasher.write_u32(image.height());
    hasher.write(image.as_raw());
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opaque_columns(size: u32, w: u32) -> RgbaImage {
        RgbaImage::from_fn(size, size, |x, _| {
            if x < w {
                Rgba([200, 10, 10, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }

    #[test]
    fn effective_width_ignores_trailing_transparent_columns() {
        for w in [1, 5, 16] {
            assert_eq!(effective_width(&opaque_columns(16, w)), w, "content in [0, {w})");
        }
        assert_eq!(effective_width(&RgbaImage::new(16, 16)), 0, "fully transparent");
    }

    #[test]
    fn effective_width_counts_leading_gaps() {
        let mut img = RgbaImage::new(10, 4);
        img.put_pixel(6, 3, Rgba([1, 1, 1, 1]));
        assert_eq!(effective_width(&img), 7, "left edge is never trimmed");
    }

    #[test]
    fn square_canvas_anchors_top_left() {
        let src = opaque_columns(16, 16);
        let canvas = square_canvas(&src, 40);
        assert!(is_square(&canvas, 40));
        assert_eq!(canvas.get_pixel(0, 0)[3], 255);
        assert_eq!(canvas.get_pixel(15, 15)[3], 255);
        assert_eq!(canvas.get_pixel(16, 0)[3], 0, "right of the source is transparent");
        assert_eq!(canvas.get_pixel(0, 16)[3], 0, "below the source is transparent");
    }

    #[test]
    fn layer_split_has_one_faint_pixel() {
        let img = layer_split_image();
        let visible: Vec<_> = img
            .enumerate_pixels()
            .filter(|(_, _, p)| p[3] != 0)
            .map(|(x, y, p)| (x, y, p[3]))
            .collect();
        assert_eq!(visible, vec![(255, 0, 0x11)]);
    }

    #[test]
    fn png_survives_encoding() {
        let src = opaque_columns(8, 3);
        let back = decode_png(&encode_png(&src).unwrap()).unwrap();
        assert_eq!(back, src);
        assert!(decode_png(b"not a png").is_err());
    }

    #[test]
    fn hash_depends_on_pixels_and_shape() {
        let a = opaque_columns(8, 3);
        let b = opaque_columns(8, 4);
        assert_eq!(content_hash(&a), content_hash(&a.clone()));
        assert_ne!(content_hash(&a), content_hash(&b));
        assert_ne!(
            content_hash(&RgbaImage::new(2, 8)),
            content_hash(&RgbaImage::new(4, 4)),
            "same byte count, different shape"
        );
        assert_eq!(content_hash(&a).len(), 16);
    }
}
