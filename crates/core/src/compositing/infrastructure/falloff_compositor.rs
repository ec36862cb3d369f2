use crate::compositing::domain::composite_result::CompositeResult;
use crate::compositing::domain::compositor::Compositor;
use crate::shared::error::CompositeFailure;
use crate::shared::image::Image;
use crate::shared::region::Region;
use crate::stylizing::domain::styled_face::StyledFace;

use super::falloff_mask::FalloffMask;
use super::resample;

/// Resizes the face to the target, then alpha-blends it through an
/// elliptical falloff mask.
pub struct FalloffCompositor {
    core_fraction: f64,
}

impl FalloffCompositor {
    pub fn new(core_fraction: f64) -> Self {
        Self { core_fraction }
    }
}

impl Compositor for FalloffCompositor {
    fn composite(
        &self,
        face: &StyledFace,
        destination: &Image,
        target: Region,
    ) -> Result<CompositeResult, CompositeFailure> {
        if target.is_degenerate() {
            return Err(CompositeFailure::DegenerateTarget(target));
        }
        let (dw, dh) = (destination.width(), destination.height());
        let visible = target.clamp_to(dw, dh);
        if visible.is_degenerate() {
            return Err(CompositeFailure::OutsideDestination {
                region: target,
                width: dw,
                height: dh,
            });
        }
        let out_of_bounds = !target.fits_within(dw, dh);
        if out_of_bounds {
            log::warn!(
                "Target region {target:?} exceeds the {dw}x{dh} template; clamped to {visible:?}"
            );
        }

        // Only the visible part of the resized face and mask is computed
        let (tw, th) = (target.width as usize, target.height as usize);
        let ox = (visible.x as i64 - target.x as i64) as usize;
        let oy = (visible.y as i64 - target.y as i64) as usize;
        let (vw, vh) = (visible.width as usize, visible.height as usize);
        let (cols, rows) = (ox..ox + vw, oy..oy + vh);
        let patch =
            resample::resize_window(&face.image, tw as u32, th as u32, cols.clone(), rows.clone());
        let mask = FalloffMask::elliptical_window(tw, th, self.core_fraction, cols, rows);

        let mut data = destination.data().to_vec();
        let stride = dw as usize * 3;
        for ly in 0..vh {
            let y = visible.y as usize + ly;
            for lx in 0..vw {
                let x = visible.x as usize + lx;
                let m = mask.at(lx, ly);
                let pi = (ly * vw + lx) * 3;
                let di = y * stride + x * 3;
                for c in 0..3 {
                    let s = patch.data()[pi + c] as f32;
                    let d = data[di + c] as f32;
                    data[di + c] = (m * s + (1.0 - m) * d).round().clamp(0.0, 255.0) as u8;
                }
            }
        }

        Ok(CompositeResult {
            image: Image::new(data, dw, dh),
            region: visible,
            requested: target,
            out_of_bounds,
        })
    }
}
