//! Image encoding: `DynamicImage` → base64 PNG data URI.
//!
//! Emitted images travel inline with the Markdown as
//! `data:image/png;base64,…` strings, indexed by the same sequence number
//! as their `![image N](N)` reference. PNG is chosen over JPEG because it
//! is lossless — cropped figures often contain fine line work and text
//! that JPEG artefacts would smear.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised image region as a base64 PNG data URI.
pub fn encode_region(img: &DynamicImage) -> Result<String, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image region → {} bytes base64", b64.len());

    Ok(format!("data:image/png;base64,{b64}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let uri = encode_region(&img).expect("encode should succeed");
        assert!(uri.starts_with("data:image/png;base64,"));

        // Verify the payload is valid base64 PNG.
        let b64 = uri.strip_prefix("data:image/png;base64,").unwrap();
        let decoded = STANDARD.decode(b64).expect("valid base64");
        assert_eq!(&decoded[1..4], b"PNG");
    }
}
