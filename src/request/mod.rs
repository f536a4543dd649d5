mod builder;
pub mod metrics;
mod state;
mod submit;
#[cfg(test)]
mod tests;

pub use builder::{CONFIG_PART, EvaluationPayload, INPUT_DATA_PART, NUM_QUESTIONS_PART, build_job};
pub use state::{Action, ConsoleState, MetricSelection, reduce};
pub use submit::EvaluationSubmitter;
