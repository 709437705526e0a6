pub mod error;
pub mod input;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod stats;

pub use error::{AnnotError, ConfigError, ReferenceError, SampleError};
pub use model::atlas::ReferenceAtlas;
pub use model::config::{AnnotateConfig, GeneSelection, Granularity, Mode};
pub use model::matrix::ExpressionMatrix;
pub use model::result::{BatchResult, ClassificationResult, FineTuneRound, SampleOutcome};
pub use pipeline::engine::classify;
