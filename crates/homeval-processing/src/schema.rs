//! Schema validation.

use crate::error::{ProcessingError, Result};
use polars::prelude::*;

/// Ensure that the DataFrame contains every required column.
///
/// Columns are matched by name, not position. On failure the error lists
/// every missing column in the order they were requested.
pub fn require_columns<S: AsRef<str>>(df: &DataFrame, required: &[S]) -> Result<()> {
    let present = df.get_column_names();

    let missing: Vec<String> = required
        .iter()
        .map(|c| c.as_ref())
        .filter(|c| !present.iter().any(|p| p.as_str() == *c))
        .map(str::to_string)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ProcessingError::Schema { missing })
    }
}
