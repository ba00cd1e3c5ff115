//! Header normalization.

use polars::prelude::DataFrame;

use crate::error::Result;

/// Canonical column name: BOM and surrounding whitespace removed, upper-cased.
pub fn normalize_header(value: &str) -> String {
    value.trim_start_matches('\u{feff}').trim().to_uppercase()
}

/// Renames every column of `df` to its canonical form.
pub fn normalize_headers(df: &mut DataFrame) -> Result<()> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    for name in names {
        let normalized = normalize_header(&name);
        if normalized != name {
            df.rename(&name, normalized.into())?;
        }
    }
    Ok(())
}
