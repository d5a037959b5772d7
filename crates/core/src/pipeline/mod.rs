pub mod batch_executor;
pub mod cluster_crops_use_case;
pub mod composite_use_case;
pub mod detect_lights_use_case;
pub mod infrastructure;
pub mod pipeline_logger;
