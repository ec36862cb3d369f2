pub mod batch_executor;
pub mod personalize_use_case;
pub mod pipeline_logger;
pub mod pipeline_state;
pub mod settings;
pub mod target_region;
