//! DOM enricher: given screen coordinates, produces a rich element
//! identity and frame chain via one scripted evaluation in the browser.

pub mod enricher;
pub mod error;
pub mod evaluator;
pub mod scripts;

pub use enricher::Enricher;
pub use error::DomError;
pub use evaluator::ScriptEvaluator;
