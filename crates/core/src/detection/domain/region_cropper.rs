use thiserror::Error;

use crate::shared::constants::CROP_EYE_SCALE;
use crate::shared::frame::Frame;

use super::landmarks::{LandmarkSet, REQUIRED_POINTS};

/// Vertical bias subtracted from the side before halving, in pixels.
const VERTICAL_BIAS: f64 = 0.2;

/// Axis-aligned square crop in frame pixel coordinates.
///
/// The top-left corner is signed so that a region computed partly
/// outside the frame can still be described (and reported).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRegion {
    pub x: i32,
    pub y: i32,
    pub side: u32,
}

impl CropRegion {
    pub fn contains_within(&self, frame_width: u32, frame_height: u32) -> bool {
        let side = self.side as i64;
        self.x >= 0
            && self.y >= 0
            && self.x as i64 + side <= frame_width as i64
            && self.y as i64 + side <= frame_height as i64
    }
}

#[derive(Error, Clone, Debug, PartialEq)]
pub enum CropError {
    #[error("crop {region:?} exceeds {frame_width}x{frame_height} frame")]
    OutOfBounds {
        region: CropRegion,
        frame_width: u32,
        frame_height: u32,
    },
    #[error("landmark set has {found} points, need at least {required}")]
    MissingLandmark { required: usize, found: usize },
    #[error("landmarks produce an empty crop")]
    Degenerate,
}

/// Square crop around the face center, sized from the inter-eye distance.
///
/// `side = round(2.3 * eye_distance * frame_width)`; the corner is the
/// center in pixels minus half the side (minus a 0.2px bias vertically).
/// Bounds are checked on the real-valued corner; the returned region is
/// that corner floored to whole pixels. Pure: the same inputs always give
/// the same region.
pub fn compute_crop(
    landmarks: &LandmarkSet,
    frame_width: u32,
    frame_height: u32,
) -> Result<CropRegion, CropError> {
    let (center, eye_distance) = match (landmarks.center(), landmarks.eye_distance()) {
        (Some(c), Some(d)) => (c, d),
        _ => {
            return Err(CropError::MissingLandmark {
                required: REQUIRED_POINTS,
                found: landmarks.len(),
            })
        }
    };

    let fw = frame_width as f64;
    let fh = frame_height as f64;
    let side = (CROP_EYE_SCALE * eye_distance * fw).round();
    let left = center.x as f64 * fw - side / 2.0;
    let top = center.y as f64 * fh - (side - VERTICAL_BIAS) / 2.0;

    if !(side.is_finite() && left.is_finite() && top.is_finite()) || side < 1.0 {
        return Err(CropError::Degenerate);
    }

    let region = CropRegion {
        x: left.floor() as i32,
        y: top.floor() as i32,
        side: side as u32,
    };

    let inside = left >= 0.0 && top >= 0.0 && left + side <= fw && top + side <= fh;
    if !inside {
        return Err(CropError::OutOfBounds {
            region,
            frame_width,
            frame_height,
        });
    }

    Ok(region)
}

/// Copies the region's pixels out of the frame.
///
/// Only `None` if the region does not fit, which `compute_crop` already
/// rules out for regions it returns.
pub fn extract(frame: &Frame, region: &CropRegion) -> Option<Frame> {
    if !region.contains_within(frame.width(), frame.height()) {
        return None;
    }
    frame.crop(region.x as u32, region.y as u32, region.side, region.side)
}
