//! Imputation module for handling missing values.
//!
//! Statistical imputation: median for numeric columns, mode (or a fixed
//! sentinel) for categorical columns.

mod statistical;

pub use statistical::{MISSING_SENTINEL, StatisticalImputer, fill_missing};
