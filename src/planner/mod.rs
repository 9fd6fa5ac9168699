//! Query plan introspection

pub mod explain;

pub use explain::ExplainPlan;
