//! Application context wiring the pipeline together.

pub mod context;

pub use context::AppContext;
