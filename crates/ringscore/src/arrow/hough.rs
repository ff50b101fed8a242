//! Progressive probabilistic Hough transform.
//!
//! Edge pixels are visited in a seeded random order. Each pixel votes; once a
//! bin reaches the threshold, the corresponding line is traced through the
//! edge mask in both directions (bridging gaps up to `max_line_gap`), its
//! pixels are consumed, and, if long enough, their votes are withdrawn and
//! the segment is emitted.

use image::GrayImage;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::config::HoughConfig;

/// Straight segment with `point1` as the left endpoint (smaller x, then
/// smaller y).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LineSegment {
    pub point1: [f64; 2],
    pub point2: [f64; 2],
}

impl LineSegment {
    pub fn new(a: [f64; 2], b: [f64; 2]) -> Self {
        let a_first = a[0] < b[0] || (a[0] == b[0] && a[1] <= b[1]);
        if a_first {
            Self {
                point1: a,
                point2: b,
            }
        } else {
            Self {
                point1: b,
                point2: a,
            }
        }
    }

    pub fn length(&self) -> f64 {
        (self.point2[0] - self.point1[0]).hypot(self.point2[1] - self.point1[1])
    }
}

struct Accumulator {
    votes: Vec<u32>,
    num_rho: usize,
    rho_offset: isize,
    /// `(cos θ / ρ, sin θ / ρ)` per angle bin.
    trig: Vec<(f64, f64)>,
}

impl Accumulator {
    fn new(width: u32, height: u32, rho: f64, theta: f64) -> Self {
        let num_angle = ((std::f64::consts::PI / theta).round() as usize).max(1);
        let num_rho = (((width + height) as f64 * 2.0 + 1.0) / rho).round() as usize;
        let trig = (0..num_angle)
            .map(|n| {
                let (s, c) = (n as f64 * theta).sin_cos();
                (c / rho, s / rho)
            })
            .collect();
        Self {
            votes: vec![0; num_angle * num_rho],
            num_rho,
            rho_offset: (num_rho as isize - 1) / 2,
            trig,
        }
    }

    fn bin(&self, n: usize, x: usize, y: usize) -> Option<usize> {
        let (c, s) = self.trig[n];
        let r = (x as f64 * c + y as f64 * s).round() as isize + self.rho_offset;
        (0..self.num_rho as isize)
            .contains(&r)
            .then(|| n * self.num_rho + r as usize)
    }

    /// Add one vote per angle; returns the strongest bin `(angle, votes)`.
    fn vote(&mut self, x: usize, y: usize) -> (usize, u32) {
        let mut best = (0, 0);
        for n in 0..self.trig.len() {
            if let Some(i) = self.bin(n, x, y) {
                self.votes[i] += 1;
                if self.votes[i] > best.1 {
                    best = (n, self.votes[i]);
                }
            }
        }
        best
    }

    fn unvote(&mut self, x: usize, y: usize) {
        for n in 0..self.trig.len() {
            if let Some(i) = self.bin(n, x, y) {
                self.votes[i] = self.votes[i].saturating_sub(1);
            }
        }
    }
}

/// Pixel walk along a line, one unit step along the dominant axis.
#[derive(Clone, Copy)]
struct Walker {
    origin: (f64, f64),
    step: (f64, f64),
    width: usize,
    height: usize,
}

impl Walker {
    fn pixel(&self, i: usize) -> Option<(usize, usize)> {
        let x = (self.origin.0 + self.step.0 * i as f64).round();
        let y = (self.origin.1 + self.step.1 * i as f64).round();
        let inside =
            x >= 0.0 && y >= 0.0 && (x as usize) < self.width && (y as usize) < self.height;
        inside.then(|| (x as usize, y as usize))
    }

    fn reversed(&self) -> Self {
        Self {
            step: (-self.step.0, -self.step.1),
            ..*self
        }
    }
}

/// Detect line segments in a binary edge image (nonzero = edge).
pub fn probabilistic_hough(edges: &GrayImage, cfg: &HoughConfig) -> Vec<LineSegment> {
    let (w, h) = edges.dimensions();
    let (width, height) = (w as usize, h as usize);
    if width == 0 || height == 0 || !(cfg.rho > 0.0) || !(cfg.theta_deg > 0.0) {
        return Vec::new();
    }

    let mut acc = Accumulator::new(w, h, cfg.rho, cfg.theta_deg.to_radians());
    let mut mask = vec![false; width * height];
    let mut voted = vec![false; width * height];
    let mut points = Vec::new();
    for (x, y, p) in edges.enumerate_pixels() {
        if p[0] != 0 {
            mask[y as usize * width + x as usize] = true;
            points.push((x as usize, y as usize));
        }
    }
    points.shuffle(&mut StdRng::seed_from_u64(cfg.seed));

    let gap_limit = cfg.max_line_gap.max(0.0).floor() as usize;
    let mut segments = Vec::new();

    for &(x, y) in &points {
        let idx = y * width + x;
        if !mask[idx] {
            continue;
        }
        let (best_angle, best_votes) = acc.vote(x, y);
        voted[idx] = true;
        if best_votes < cfg.threshold {
            continue;
        }

        // Direction along the line is perpendicular to the bin normal.
        let (c, s) = acc.trig[best_angle];
        let (a, b) = (-s, c);
        let step = if a.abs() > b.abs() {
            (a.signum(), b / a.abs())
        } else {
            (a / b.abs(), b.signum())
        };
        let forward = Walker {
            origin: (x as f64, y as f64),
            step,
            width,
            height,
        };
        let walkers = [forward, forward.reversed()];

        // Farthest edge pixel reached in each direction, in steps.
        let mut reach = [0usize; 2];
        for (k, walker) in walkers.iter().enumerate() {
            let mut gap = 0;
            let mut i = 1;
            while let Some((px, py)) = walker.pixel(i) {
                if mask[py * width + px] {
                    gap = 0;
                    reach[k] = i;
                } else {
                    gap += 1;
                    if gap > gap_limit {
                        break;
                    }
                }
                i += 1;
            }
        }

        let end = |k: usize| walkers[k].pixel(reach[k]).unwrap_or((x, y));
        let (e0, e1) = (end(0), end(1));
        let dx = (e0.0 as f64 - e1.0 as f64).abs();
        let dy = (e0.1 as f64 - e1.1 as f64).abs();
        let good = dx >= cfg.min_line_length || dy >= cfg.min_line_length;

        // Consume the traced pixels; withdraw their votes when kept.
        for (k, walker) in walkers.iter().enumerate() {
            let first = if k == 0 { 0 } else { 1 };
            for i in first..=reach[k] {
                let Some((px, py)) = walker.pixel(i) else {
                    break;
                };
                let j = py * width + px;
                if mask[j] {
                    if good && voted[j] {
                        acc.unvote(px, py);
                        voted[j] = false;
                    }
                    mask[j] = false;
                }
            }
        }

        if good {
            let seg = LineSegment::new(
                [e0.0 as f64, e0.1 as f64],
                [e1.0 as f64, e1.1 as f64],
            );
            tracing::trace!(
                "hough segment ({:.0}, {:.0})-({:.0}, {:.0}) from bin {} with {} votes",
                seg.point1[0],
                seg.point1[1],
                seg.point2[0],
                seg.point2[1],
                best_angle,
                best_votes
            );
            segments.push(seg);
        }
    }
    segments
}
