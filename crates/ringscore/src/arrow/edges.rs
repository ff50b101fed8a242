//! Edge map preparation for the line detector.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::config::ArrowDetectConfig;
use crate::preprocess::{adjust_gamma, blur, stretch_contrast};

/// Canny edges of the enhanced, smoothed grayscale image.
pub fn edge_map(gray: &GrayImage, cfg: &ArrowDetectConfig) -> GrayImage {
    let enhanced = adjust_gamma(
        &stretch_contrast(gray, cfg.contrast_clip_fraction),
        cfg.gamma,
    );
    let smoothed = blur(&enhanced, cfg.blur_sigma);
    imageproc::edges::canny(&smoothed, cfg.canny_low, cfg.canny_high)
}

#[derive(Debug, Clone, Copy)]
struct ComponentStats {
    count: u32,
    min: [u32; 2],
    max: [u32; 2],
}

impl ComponentStats {
    fn new(x: u32, y: u32) -> Self {
        Self {
            count: 0,
            min: [x, y],
            max: [x, y],
        }
    }

    fn add(&mut self, x: u32, y: u32) {
        self.count += 1;
        self.min = [self.min[0].min(x), self.min[1].min(y)];
        self.max = [self.max[0].max(x), self.max[1].max(y)];
    }

    /// Diagonal of the inclusive bounding box.
    fn bbox_diagonal(&self) -> f64 {
        let w = (self.max[0] - self.min[0] + 1) as f64;
        let h = (self.max[1] - self.min[1] + 1) as f64;
        w.hypot(h)
    }

    fn is_noise(&self, min_pixels: u32, diagonal_tolerance: f64) -> bool {
        let diag = self.bbox_diagonal();
        self.count < min_pixels || (self.count as f64 - diag).abs() <= diagonal_tolerance * diag
    }
}

/// Erase 8-connected edge components that are too small, or whose pixel
/// count is within `diagonal_tolerance` of their bounding-box diagonal.
pub fn remove_small_edges(
    edges: &GrayImage,
    min_pixels: u32,
    diagonal_tolerance: f64,
) -> GrayImage {
    let labels = connected_components(edges, Connectivity::Eight, Luma([0u8]));

    let mut stats: Vec<Option<ComponentStats>> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let id = label[0] as usize;
        if id == 0 {
            continue;
        }
        if stats.len() <= id {
            stats.resize(id + 1, None);
        }
        stats[id].get_or_insert_with(|| ComponentStats::new(x, y)).add(x, y);
    }

    let noise: Vec<bool> = stats
        .iter()
        .map(|s| s.map_or(false, |s| s.is_noise(min_pixels, diagonal_tolerance)))
        .collect();
    let erased = noise.iter().filter(|&&n| n).count();
    tracing::trace!(
        "edge cleanup: {} of {} components erased",
        erased,
        stats.len().saturating_sub(1)
    );

    let mut out = edges.clone();
    for (x, y, label) in labels.enumerate_pixels() {
        let id = label[0] as usize;
        if id != 0 && noise[id] {
            out.put_pixel(x, y, Luma([0]));
        }
    }
    out
}

/// Diamond dilation bridging small gaps between edge fragments.
pub fn close_gaps(edges: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return edges.clone();
    }
    imageproc::morphology::dilate(edges, Norm::L1, radius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::count_nonzero;

    fn put(img: &mut GrayImage, pts: impl IntoIterator<Item = (u32, u32)>) {
        for (x, y) in pts {
            img.put_pixel(x, y, Luma([255]));
        }
    }

    #[test]
    fn specks_and_straight_runs_are_erased() {
        let mut img = GrayImage::new(80, 80);
        // Three-pixel speck.
        put(&mut img, [(5, 5), (6, 5), (6, 6)]);
        // Horizontal run: count equals its diagonal.
        put(&mut img, (10..60).map(|x| (x, 20)));
        // Diagonal run: count is ~0.71 of its diagonal.
        put(&mut img, (10..40).map(|i| (i, 30 + i)));
        let out = remove_small_edges(&img, 10, 0.1);

        assert_eq!(out.get_pixel(5, 5)[0], 0);
        assert_eq!(out.get_pixel(30, 20)[0], 0);
        assert_eq!(out.get_pixel(20, 50)[0], 255);
    }

    #[test]
    fn curved_component_survives() {
        let mut img = GrayImage::new(60, 60);
        let mut pts = Vec::new();
        for a in 0..360 {
            let t = (a as f64).to_radians();
            pts.push((
                (30.0 + 20.0 * t.cos()).round() as u32,
                (30.0 + 20.0 * t.sin()).round() as u32,
            ));
        }
        put(&mut img, pts);
        let out = remove_small_edges(&img, 10, 0.1);
        assert_eq!(out, img);
    }

    #[test]
    fn dilation_grows_by_diamond() {
        let mut img = GrayImage::new(11, 11);
        put(&mut img, [(5, 5)]);
        let out = close_gaps(&img, 2);
        assert_eq!(count_nonzero(&out), 13);
        assert_eq!(out.get_pixel(7, 5)[0], 255);
        assert_eq!(out.get_pixel(6, 6)[0], 255);
        assert_eq!(out.get_pixel(7, 6)[0], 0);
        assert_eq!(close_gaps(&img, 0), img);
    }

    #[test]
    fn edge_map_finds_step() {
        let gray = GrayImage::from_fn(40, 40, |x, _| {
            Luma([match x {
                0..=19 => 30,
                20 => 160,
                _ => 220,
            }])
        });
        let edges = edge_map(&gray, &ArrowDetectConfig::default());
        assert!(count_nonzero(&edges) >= 30);
        assert!(edges
            .enumerate_pixels()
            .filter(|p| p.2[0] != 0)
            .all(|(x, _, _)| (16..=23).contains(&x)));
    }
}
