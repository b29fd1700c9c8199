pub mod macros;
pub mod matching;
pub mod pricing;
pub mod strategy;
