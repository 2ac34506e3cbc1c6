pub mod au_pipeline;
pub mod factory;
pub mod frame_adapter;
pub mod pipeline_logger;
