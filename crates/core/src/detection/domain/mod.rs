pub mod detection;
pub mod face_landmarks;
pub mod face_locator;
pub mod face_selection;
