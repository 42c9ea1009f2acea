pub mod essay;
pub mod grading;
pub mod loaders;

pub use essay::{EssayInput, FailedEssay, GradedRow};
pub use grading::{Criterion, CriterionResult, GradingOutcome, GradingResult};
pub use loaders::load_essays;
