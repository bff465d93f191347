use image::{DynamicImage, GrayImage, Luma};

/// Convert any raster into single-channel 8-bit grayscale.
///
/// 8-bit color uses the BT.601 luma weights in 14-bit fixed point. Any other
/// element type is converted through `f32`: values that all lie in [0, 1] are
/// scaled by 255, larger values are taken as already in [0, 255]; both are
/// clamped and truncated. An 8-bit grayscale input is returned unchanged.
pub fn normalize(img: &DynamicImage) -> GrayImage {
    match img {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        DynamicImage::ImageLumaA8(gray_alpha) => {
            GrayImage::from_fn(gray_alpha.width(), gray_alpha.height(), |x, y| {
                Luma([gray_alpha.get_pixel(x, y)[0]])
            })
        }
        DynamicImage::ImageRgb8(rgb) => GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
            let p = rgb.get_pixel(x, y);
            Luma([luma_u8(p[0], p[1], p[2])])
        }),
        DynamicImage::ImageRgba8(rgba) => {
            GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
                let p = rgba.get_pixel(x, y);
                Luma([luma_u8(p[0], p[1], p[2])])
            })
        }
        other => normalize_float(other),
    }
}

/// Normalize and wrap back into a `DynamicImage`
pub fn normalize_dynamic(img: &DynamicImage) -> DynamicImage {
    DynamicImage::ImageLuma8(normalize(img))
}

pub fn is_normalized(img: &DynamicImage) -> bool {
    matches!(img, DynamicImage::ImageLuma8(_))
}

fn luma_u8(r: u8, g: u8, b: u8) -> u8 {
    // 0.299, 0.587, 0.114 scaled by 2^14
    const R: u32 = 4899;
    const G: u32 = 9617;
    const B: u32 = 1868;
    ((r as u32 * R + g as u32 * G + b as u32 * B + (1 << 13)) >> 14) as u8
}

fn normalize_float(img: &DynamicImage) -> GrayImage {
    let rgb = img.to_rgb32f();
    let (width, height) = rgb.dimensions();

    let luma: Vec<f32> = rgb
        .pixels()
        .map(|p| 0.299 * p[0] + 0.587 * p[1] + 0.114 * p[2])
        .collect();

    let max = luma.iter().cloned().fold(0.0f32, f32::max);
    let scale = if max <= 1.0 { 255.0 } else { 1.0 };

    let data = luma
        .into_iter()
        .map(|v| (v * scale).clamp(0.0, 255.0) as u8)
        .collect();

    GrayImage::from_raw(width, height, data)
        .unwrap_or_else(|| GrayImage::new(width, height))
}
