//! Feature engineering.
//!
//! Derived columns computed from raw listing attributes, and the fit-once
//! column transform that turns them into a model matrix.

mod builders;
mod transform;

pub use builders::{
    BED_BATH_RATIO, HOUSE_AGE, PRICE_COLUMN, PRICE_PER_SQFT, REQUIRED_FEATURE_INPUTS,
    create_features,
};
pub use transform::{ColumnTransform, FORMAT_VERSION, FittedTransform, TransformSpec};
