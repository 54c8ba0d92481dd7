//! Command implementations.

mod query;
mod run;
mod serve;
mod validate;

pub use query::run_query;
pub use run::run_pipeline;
pub use serve::run_serve;
pub use validate::run_validate;
