use image::{GrayImage, Luma, RgbaImage};
use imageproc::contrast;
use imageproc::stats::cumulative_histogram;

use super::gray::luma_601;
use crate::config::RedFilterConfig;

/// HSV on the 8-bit convention: hue in [0, 180), saturation and value in
/// [0, 255].
pub(crate) fn hsv_u8_scale([r, g, b, _]: [u8; 4]) -> [f32; 3] {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let sat = if max > 0.0 { delta / max * 255.0 } else { 0.0 };
    let hue_deg = if delta <= 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    let hue_deg = if hue_deg < 0.0 { hue_deg + 360.0 } else { hue_deg };
    [hue_deg / 2.0, sat, max]
}

/// Gray image keeping only pixels whose hue falls in either red range.
pub fn red_filter(rgba: &RgbaImage, cfg: &RedFilterConfig) -> GrayImage {
    GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let px = rgba.get_pixel(x, y).0;
        let [h, s, v] = hsv_u8_scale(px);
        let red_hue = h <= cfg.hue_low_max || h >= cfg.hue_high_min;
        if red_hue && s >= cfg.min_saturation && v >= cfg.min_value {
            Luma([luma_601(px)])
        } else {
            Luma([0])
        }
    })
}

/// Global percentile stretch: the `clip` and `1 − clip` percentiles of the
/// whole image map to 0 and 255.
///
/// Images whose percentiles coincide are returned unchanged.
pub fn stretch_contrast(gray: &GrayImage, clip: f64) -> GrayImage {
    let total = gray.width() as u64 * gray.height() as u64;
    if total == 0 {
        return gray.clone();
    }
    let hist = cumulative_histogram(gray);
    let cumulative = &hist.channels[0];

    let clip = clip.clamp(0.0, 0.49);
    let low_count = (clip * total as f64).floor() as u64;
    let high_count = total - low_count;
    let low = cumulative.iter().position(|&c| c as u64 > low_count);
    let high = cumulative.iter().position(|&c| c as u64 >= high_count);

    match (low, high) {
        (Some(low), Some(high)) if high > low => {
            contrast::stretch_contrast(gray, low as u8, high as u8, 0, 255)
        }
        _ => gray.clone(),
    }
}

/// Power-law intensity mapping `255 · (v / 255)^gamma`.
pub fn adjust_gamma(gray: &GrayImage, gamma: f64) -> GrayImage {
    if !(gamma > 0.0) || (gamma - 1.0).abs() < 1e-12 {
        return gray.clone();
    }
    let lut: Vec<u8> = (0..=255u8)
        .map(|v| (255.0 * (v as f64 / 255.0).powf(gamma)).round() as u8)
        .collect();
    remap(gray, &lut)
}

fn remap(gray: &GrayImage, lut: &[u8]) -> GrayImage {
    let mut out = gray.clone();
    for p in out.pixels_mut() {
        p[0] = lut[p[0] as usize];
    }
    out
}
