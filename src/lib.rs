pub mod api;
pub mod config;
pub mod error;
pub mod history;
pub mod llm;
pub mod monitoring;
pub mod optimizer;

pub use error::{OptimizerError, OptimizerResult};
pub use optimizer::OptimizerService;
