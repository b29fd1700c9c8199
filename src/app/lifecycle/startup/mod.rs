mod startup;
pub mod tasks;

pub use startup::build_start_pipeline;
