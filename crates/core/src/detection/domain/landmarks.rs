//! Pose/face landmarks in normalized frame coordinates.
//!
//! Index semantics follow the BlazePose topology: 0 is the nose (used as
//! the face center), 3 and 6 are the outer corners of the left and right
//! eye. Their distance is the face-scale proxy used for cropping.

pub const FACE_CENTER: usize = 0;
pub const LEFT_EYE_OUTER: usize = 3;
pub const RIGHT_EYE_OUTER: usize = 6;

/// Minimum number of points a set must carry to be usable for cropping.
pub const REQUIRED_POINTS: usize = RIGHT_EYE_OUTER + 1;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Landmark {
    /// Horizontal position, 0.0 = left edge, 1.0 = right edge.
    pub x: f32,
    /// Vertical position, 0.0 = top edge, 1.0 = bottom edge.
    pub y: f32,
    /// Depth relative to the hips; smaller is closer to the camera.
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance in the image plane (z ignored).
    pub fn planar_distance(&self, other: &Landmark) -> f64 {
        let dx = self.x as f64 - other.x as f64;
        let dy = self.y as f64 - other.y as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

/// One frame's landmarks in model order. No identity across frames.
#[derive(Clone, Debug, PartialEq)]
pub struct LandmarkSet {
    points: Vec<Landmark>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.points.get(index)
    }

    pub fn center(&self) -> Option<&Landmark> {
        self.get(FACE_CENTER)
    }

    /// Normalized distance between the outer eye corners.
    pub fn eye_distance(&self) -> Option<f64> {
        let left = self.get(LEFT_EYE_OUTER)?;
        let right = self.get(RIGHT_EYE_OUTER)?;
        Some(left.planar_distance(right))
    }
}
