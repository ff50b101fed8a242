use image::{GrayImage, ImageBuffer, Luma, Pixel, Primitive, RgbaImage};

/// BT.601 luma of an RGBA image; alpha is ignored.
pub fn to_gray(rgba: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        Luma([luma_601(rgba.get_pixel(x, y).0)])
    })
}

pub(crate) fn luma_601([r, g, b, _]: [u8; 4]) -> u8 {
    let y = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    y.round().clamp(0.0, 255.0) as u8
}

/// Binary mask: `pixel > level` maps to 255, or to 0 when `invert` is set.
///
/// `level` stays fractional so that mean-derived levels are applied exactly.
pub fn threshold(gray: &GrayImage, level: f64, invert: bool) -> GrayImage {
    let (on, off) = if invert { (0u8, 255u8) } else { (255u8, 0u8) };
    let mut out = GrayImage::new(gray.width(), gray.height());
    for (dst, src) in out.pixels_mut().zip(gray.pixels()) {
        dst[0] = if src[0] as f64 > level { on } else { off };
    }
    out
}

/// Gaussian blur; non-positive `sigma` returns an unchanged copy.
///
/// Filtering runs in `f32` and rounds back, so uniform regions keep their
/// exact value.
pub fn blur(gray: &GrayImage, sigma: f32) -> GrayImage {
    if !(sigma > 0.0) {
        return gray.clone();
    }
    let (w, h) = gray.dimensions();
    let f = ImageBuffer::<Luma<f32>, Vec<f32>>::from_fn(w, h, |x, y| {
        Luma([gray.get_pixel(x, y)[0] as f32])
    });
    let blurred = imageproc::filter::gaussian_blur_f32(&f, sigma);
    GrayImage::from_fn(w, h, |x, y| {
        Luma([blurred.get_pixel(x, y)[0].round().clamp(0.0, 255.0) as u8])
    })
}

/// Mean intensity over the nonzero pixels of `mask` (or the whole image).
///
/// `None` when the mask selects nothing or the image is empty.
pub fn mean_intensity(gray: &GrayImage, mask: Option<&GrayImage>) -> Option<f64> {
    let (sum, count) = match mask {
        None => gray
            .pixels()
            .fold((0u64, 0u64), |(s, n), p| (s + p[0] as u64, n + 1)),
        Some(mask) => gray
            .pixels()
            .zip(mask.pixels())
            .filter(|(_, m)| m[0] != 0)
            .fold((0u64, 0u64), |(s, n), (p, _)| (s + p[0] as u64, n + 1)),
    };
    (count > 0).then(|| sum as f64 / count as f64)
}

/// Copy of `image` with every pixel outside `mask` set to zero.
pub fn apply_mask<P>(
    image: &ImageBuffer<P, Vec<P::Subpixel>>,
    mask: &GrayImage,
) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel,
{
    let mut out = image.clone();
    for (p, m) in out.pixels_mut().zip(mask.pixels()) {
        if m[0] == 0 {
            p.apply(|_| <P::Subpixel as Primitive>::DEFAULT_MIN_VALUE);
        }
    }
    out
}

/// Number of nonzero pixels.
pub fn count_nonzero(mask: &GrayImage) -> usize {
    mask.pixels().filter(|p| p[0] != 0).count()
}
