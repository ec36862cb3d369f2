pub mod face_stylizer;
pub mod styled_face;
