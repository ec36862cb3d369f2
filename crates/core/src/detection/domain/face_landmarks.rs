//! 5-point face landmarks: eyes, nose tip, mouth corners.

use serde::Serialize;

use crate::shared::constants::LANDMARK_COUNT;

const LEFT_EYE: usize = 0;
const RIGHT_EYE: usize = 1;
const NOSE: usize = 2;

/// Profile ratio reached at roughly 30 degrees of yaw.
///
/// With nose depth comparable to half the eye span, the ratio grows as
/// `0.5 * tan(yaw)`.
pub const FRONTAL_PROFILE_LIMIT: f64 = 0.29;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FaceLandmarks {
    /// `[left_eye, right_eye, nose, left_mouth, right_mouth]`, image pixels.
    points: [(f64, f64); LANDMARK_COUNT],
}

impl FaceLandmarks {
    pub fn new(points: [(f64, f64); LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[(f64, f64); LANDMARK_COUNT] {
        &self.points
    }

    /// How much the face is turned: 0.0 = frontal, 1.0 = full profile.
    ///
    /// Measures nose offset from eye midpoint relative to eye span.
    pub fn profile_ratio(&self) -> f64 {
        let nose = self.points[NOSE];
        let left_eye = self.points[LEFT_EYE];
        let right_eye = self.points[RIGHT_EYE];

        let eye_mid_x = (left_eye.0 + right_eye.0) / 2.0;
        let eye_span = (right_eye.0 - left_eye.0).abs();

        if eye_span <= 0.0 {
            return 0.0;
        }

        ((nose.0 - eye_mid_x).abs() / eye_span).min(1.0)
    }

    /// Within the accuracy boundary of the detector (about 30 degrees of yaw).
    pub fn is_near_frontal(&self) -> bool {
        self.profile_ratio() <= FRONTAL_PROFILE_LIMIT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn frontal_landmarks() -> FaceLandmarks {
        FaceLandmarks::new([
            (440.0, 350.0), // left_eye
            (560.0, 350.0), // right_eye
            (500.0, 420.0), // nose (centered)
            (460.0, 470.0), // left_mouth
            (540.0, 470.0), // right_mouth
        ])
    }

    fn left_profile_landmarks() -> FaceLandmarks {
        // Nose shifted left of eye midpoint
        FaceLandmarks::new([
            (120.0, 350.0),
            (180.0, 350.0),
            (100.0, 420.0),
            (130.0, 470.0),
            (170.0, 470.0),
        ])
    }

    #[test]
    fn test_profile_ratio_frontal() {
        // Nose at 500, eye midpoint at (440+560)/2 = 500, so ratio = 0
        assert_relative_eq!(frontal_landmarks().profile_ratio(), 0.0, epsilon = 0.01);
        assert!(frontal_landmarks().is_near_frontal());
    }

    #[test]
    fn test_profile_ratio_left_profile() {
        // Nose at 100, eye midpoint at 150, eye_span = 60 -> 50/60
        let lm = left_profile_landmarks();
        assert_relative_eq!(lm.profile_ratio(), 50.0 / 60.0, epsilon = 0.01);
        assert!(!lm.is_near_frontal());
    }

    #[test]
    fn test_profile_ratio_clamped_to_one() {
        let lm = FaceLandmarks::new([
            (100.0, 100.0),
            (110.0, 100.0), // eye_span = 10
            (200.0, 100.0), // nose offset = 95 >> eye_span
            (100.0, 100.0),
            (100.0, 100.0),
        ]);
        assert_relative_eq!(lm.profile_ratio(), 1.0);
    }

    #[test]
    fn test_profile_ratio_zero_eye_span() {
        let lm = FaceLandmarks::new([
            (100.0, 100.0),
            (100.0, 100.0),
            (150.0, 100.0),
            (100.0, 100.0),
            (100.0, 100.0),
        ]);
        assert_relative_eq!(lm.profile_ratio(), 0.0);
    }

    #[test]
    fn test_thirty_degree_boundary() {
        // Half eye span 60, nose depth 60, yaw 30deg
        let yaw = 30f64.to_radians();
        let half_span = 60.0 * yaw.cos();
        let nose_x = 500.0 + 60.0 * yaw.sin();
        let lm = FaceLandmarks::new([
            (500.0 - half_span, 350.0),
            (500.0 + half_span, 350.0),
            (nose_x, 420.0),
            (470.0, 470.0),
            (530.0, 470.0),
        ]);
        assert_relative_eq!(lm.profile_ratio(), 0.5 * yaw.tan(), epsilon = 1e-9);
        assert!((lm.profile_ratio() - FRONTAL_PROFILE_LIMIT).abs() < 0.01);
    }
}
