pub mod bilateral;
pub mod canny;
pub mod cartoon_stylizer;
pub mod gaussian;
pub mod kmeans;
