use serde::{Deserialize, Serialize};

use crate::detection::domain::detection::Detection;
use crate::shared::error::StylizationFailure;
use crate::shared::image::Image;
use crate::stylizing::domain::face_stylizer::FaceStylizer;
use crate::stylizing::domain::styled_face::StyledFace;

use super::bilateral;
use super::canny::{self, EdgeMap};
use super::kmeans::{self, KMeansParams};

pub const DEFAULT_PADDING: f64 = 0.2;
pub const DEFAULT_EDGE_LOW: f32 = 50.0;
pub const DEFAULT_EDGE_HIGH: f32 = 150.0;
pub const DEFAULT_EDGE_CLOSE_RADIUS: u32 = 2;
pub const DEFAULT_SMOOTHING_RADIUS: u32 = 4;
pub const DEFAULT_SMOOTHING_COLOR_SIGMA: f64 = 75.0;
pub const DEFAULT_SMOOTHING_SPACE_SIGMA: f64 = 75.0;
pub const DEFAULT_CLUSTERS: usize = 8;
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;
pub const DEFAULT_EPSILON: f64 = 1.0;
pub const DEFAULT_LINE_DARKENING: f64 = 0.8;

/// Knobs of the cartoon render.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartoonParams {
    /// Fraction of the box size added on every side before cropping.
    pub padding: f64,
    pub edge_low: f32,
    pub edge_high: f32,
    /// Radius of the closing disc applied to the edge map; 0 disables.
    pub edge_close_radius: u32,
    pub smoothing_radius: u32,
    pub smoothing_color_sigma: f64,
    pub smoothing_space_sigma: f64,
    pub clusters: usize,
    pub max_iterations: u32,
    pub epsilon: f64,
    /// 0.0 leaves edge pixels as they are, 1.0 paints them black.
    pub line_darkening: f64,
}

impl Default for CartoonParams {
    fn default() -> Self {
        Self {
            padding: DEFAULT_PADDING,
            edge_low: DEFAULT_EDGE_LOW,
            edge_high: DEFAULT_EDGE_HIGH,
            edge_close_radius: DEFAULT_EDGE_CLOSE_RADIUS,
            smoothing_radius: DEFAULT_SMOOTHING_RADIUS,
            smoothing_color_sigma: DEFAULT_SMOOTHING_COLOR_SIGMA,
            smoothing_space_sigma: DEFAULT_SMOOTHING_SPACE_SIGMA,
            clusters: DEFAULT_CLUSTERS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            epsilon: DEFAULT_EPSILON,
            line_darkening: DEFAULT_LINE_DARKENING,
        }
    }
}

impl CartoonParams {
    fn kmeans(&self) -> KMeansParams {
        KMeansParams {
            clusters: self.clusters,
            max_iterations: self.max_iterations,
            epsilon: self.epsilon,
        }
    }
}

/// Edges, bilateral smoothing and k-means posterization over the padded
/// face crop.
pub struct CartoonStylizer {
    params: CartoonParams,
}

impl CartoonStylizer {
    pub fn new(params: CartoonParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &CartoonParams {
        &self.params
    }

    /// Run the render on an already cropped patch.
    pub fn render(&self, crop: &Image) -> Image {
        let p = &self.params;
        let (w, h) = (crop.width() as usize, crop.height() as usize);

        let edges = canny::detect(&crop.to_luma(), w, h, p.edge_low, p.edge_high);
        let edges = canny::close(&edges, p.edge_close_radius);

        let smooth = bilateral::bilateral_filter(
            crop,
            p.smoothing_radius,
            p.smoothing_color_sigma,
            p.smoothing_space_sigma,
        );
        let fill = kmeans::quantize(&smooth, &p.kmeans());

        overlay_lines(&fill, &edges, p.line_darkening)
    }
}

impl FaceStylizer for CartoonStylizer {
    fn stylize(&self, image: &Image, detection: &Detection) -> Result<StyledFace, StylizationFailure> {
        let region = detection
            .bbox
            .padded_region(self.params.padding, image.width(), image.height());
        if region.is_degenerate() {
            return Err(StylizationFailure::DegenerateRegion {
                region,
                image_width: image.width(),
                image_height: image.height(),
            });
        }

        let crop = image.crop(&region);
        let styled = self.render(&crop);
        log::debug!(
            "Stylized {}x{} face region at ({}, {})",
            region.width,
            region.height,
            region.x,
            region.y
        );
        Ok(StyledFace {
            image: styled,
            source_region: region,
            embedding: detection.embedding.clone(),
        })
    }
}

/// Scale edge pixels by `1 - darkening`.
fn overlay_lines(fill: &Image, edges: &EdgeMap, darkening: f64) -> Image {
    let keep = (1.0 - darkening).clamp(0.0, 1.0);
    let mut data = fill.data().to_vec();
    for (px, &edge) in data.chunks_exact_mut(3).zip(edges.as_slice()) {
        if edge {
            for v in px.iter_mut() {
                *v = (*v as f64 * keep).round() as u8;
            }
        }
    }
    Image::new(data, fill.width(), fill.height())
}
