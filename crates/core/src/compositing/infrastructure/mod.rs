pub mod falloff_compositor;
pub mod falloff_mask;
pub mod resample;
