//! Versioned debug dump of a scoring run.
//!
//! Stages report into a [`DebugSink`]. The library never renders debug images
//! unless the sink asks for them, so results do not depend on the sink.

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::config::ScoreConfig;
use crate::error::Stage;
use crate::ring::{Perspective, RingEllipse, RingSet};

pub const DEBUG_SCHEMA_V1: &str = "ringscore.debug.v1";

/// Receiver for intermediate stage data.
pub trait DebugSink {
    /// Whether stages should render and hand over intermediate images.
    fn wants_images(&self) -> bool {
        false
    }

    fn image(&mut self, _label: &str, _image: &GrayImage) {}

    fn rectified(&mut self, _width: u32, _height: u32) {}

    fn band(&mut self, _record: BandDebug) {}

    fn ring_set(&mut self, _set: &RingSet) {}

    fn arrows(&mut self, _record: ArrowDebug) {}

    fn note(&mut self, _note: String) {}
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DebugSink for NullSink {}

/// Summary of one band search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandDebug {
    pub stage: Stage,
    /// Mean intensity inside the region mask.
    pub mean: f64,
    /// Threshold actually applied (`mean * scalar`).
    pub level: f64,
    /// Foreground pixels of the final smoothed mask.
    pub mask_pixels: usize,
    pub contour_count: usize,
    pub contour_points: usize,
    /// RMS Sampson distance of the contour to the fitted ellipse.
    pub fit_rms_px: f64,
    pub ellipse: RingEllipse,
}

/// Counters of the arrow detector, in pipeline order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArrowDebug {
    pub edge_pixels: usize,
    pub edge_pixels_after_cleanup: usize,
    pub segments: usize,
    /// Marks left after deduplication and the outer-circle filter.
    pub selected: usize,
    /// Marks left after the optional length-outlier filter.
    pub kept: usize,
    pub outer_radius: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StagesDebug {
    /// Size of the rectified image when rectification ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rectified_size: Option<[u32; 2]>,
    pub bands: Vec<BandDebug>,
    pub rings: Vec<RingEllipse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perspective: Option<Perspective>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrows: Option<ArrowDebug>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageDebug {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugDump {
    pub schema_version: String,
    pub image: ImageDebug,
    pub config: ScoreConfig,
    pub stages: StagesDebug,
}

/// Sink that records stage summaries and, optionally, labeled images.
#[derive(Debug, Default)]
pub struct DebugCollector {
    pub stages: StagesDebug,
    keep_images: bool,
    images: Vec<(String, GrayImage)>,
}

impl DebugCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collector that also keeps the intermediate masks.
    pub fn with_images() -> Self {
        Self {
            keep_images: true,
            ..Self::default()
        }
    }

    pub fn images(&self) -> &[(String, GrayImage)] {
        &self.images
    }

    pub fn into_images(self) -> Vec<(String, GrayImage)> {
        self.images
    }

    /// Freeze the collected stages into a dump.
    pub fn dump(&self, config: &ScoreConfig, width: u32, height: u32) -> DebugDump {
        DebugDump {
            schema_version: DEBUG_SCHEMA_V1.to_string(),
            image: ImageDebug {
                path: None,
                width,
                height,
            },
            config: config.clone(),
            stages: self.stages.clone(),
        }
    }
}

impl DebugSink for DebugCollector {
    fn wants_images(&self) -> bool {
        self.keep_images
    }

    fn image(&mut self, label: &str, image: &GrayImage) {
        if self.keep_images {
            self.images.push((label.to_string(), image.clone()));
        }
    }

    fn rectified(&mut self, width: u32, height: u32) {
        self.stages.rectified_size = Some([width, height]);
    }

    fn band(&mut self, record: BandDebug) {
        self.stages.bands.push(record);
    }

    fn ring_set(&mut self, set: &RingSet) {
        self.stages.rings = set.rings.clone();
        self.stages.perspective = Some(set.perspective);
    }

    fn arrows(&mut self, record: ArrowDebug) {
        self.stages.arrows = Some(record);
    }

    fn note(&mut self, note: String) {
        self.stages.notes.push(note);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collector_drops_images_unless_asked() {
        let img = GrayImage::new(2, 2);

        let mut plain = DebugCollector::new();
        assert!(!plain.wants_images());
        plain.image("mask", &img);
        assert!(plain.images().is_empty());

        let mut full = DebugCollector::with_images();
        full.image("mask", &img);
        assert_eq!(full.images().len(), 1);
        assert_eq!(full.images()[0].0, "mask");
    }

    #[test]
    fn dump_carries_schema_and_config() {
        let mut sink = DebugCollector::new();
        sink.note("hello".to_string());
        let dump = sink.dump(&ScoreConfig::default(), 10, 20);
        let json = serde_json::to_value(&dump).expect("serialize");
        assert_eq!(json["schema_version"], DEBUG_SCHEMA_V1);
        assert_eq!(json["image"]["height"], 20);
        assert_eq!(json["stages"]["notes"][0], "hello");
        assert!(json["config"]["arrows"]["hough"]["threshold"].is_u64());
    }
}
