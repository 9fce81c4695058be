pub mod address;
pub mod codes;
pub mod derived_code;
pub mod eval_unit;
pub mod repository;

pub use derived_code::{aggregate_key, DerivedCode, AGGREGATE_SUFFIX};
pub use eval_unit::EvalUnit;
