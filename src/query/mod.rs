//! Question to SQL to result to summary.
//!
//! - [`QueryGenerator`] asks the model for SQL against the fixed schema
//! - [`QueryExecutor`] runs it and turns failures into an empty result
//! - [`SummaryGenerator`] explains a sample of the rows in plain language

mod executor;
mod generator;
mod result;
pub mod schema;
mod summary;

pub use executor::{Execution, QueryExecutor};
pub use generator::QueryGenerator;
pub use result::QueryResult;
pub use summary::SummaryGenerator;
