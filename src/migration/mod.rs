/// This module contains the per-row transformation into normalized domain values.
pub mod transform;

/// This module contains the write-back processor driven by the CSV reader.
pub mod processor;
