pub mod composite_result;
pub mod compositor;
