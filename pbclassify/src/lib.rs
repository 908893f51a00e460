pub mod annotation;
pub mod arbiter;
pub mod chimera;
pub mod classifier;
pub mod error;
pub mod hits;
pub mod io;
pub mod options;
pub mod polya;
pub mod primer;
pub mod qc;
pub mod read;
pub mod search;
pub mod trim;
pub mod utils;

pub use classifier::Classifier;
pub use error::ClassifyError;
pub use options::{ChimeraDetectionOptions, ClassifyOptions};
pub use qc::ClassifySummary;

#[cfg(test)]
mod pipeline_test;
#[cfg(test)]
mod test_log;
