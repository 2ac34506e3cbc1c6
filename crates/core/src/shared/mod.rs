pub mod constants;
pub mod error;
pub mod frame;
pub mod grayscale;
pub mod model_resolver;
