use serde::Serialize;
use std::fmt;

const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Totals over the current working set. Always derived, never stored.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SizeSummary {
    pub files: usize,
    pub compressed_files: usize,
    pub total_original: u64,
    pub total_compressed: u64,
    /// Rounded to one decimal place.
    pub savings_percent: f64,
}

impl SizeSummary {
    pub fn new(
        files: usize,
        compressed_files: usize,
        total_original: u64,
        total_compressed: u64,
    ) -> Self {
        Self {
            files,
            compressed_files,
            total_original,
            total_compressed,
            savings_percent: savings_percent(total_original, total_compressed),
        }
    }
}

impl fmt::Display for SizeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} file(s), {} compressed: {} -> {} ({:.1}% saved)",
            self.files,
            self.compressed_files,
            format_size(self.total_original),
            format_size(self.total_compressed),
            self.savings_percent
        )
    }
}

/// Zero until something has been compressed, so a fresh working set does not
/// report 100% savings.
pub fn savings_percent(total_original: u64, total_compressed: u64) -> f64 {
    if total_original == 0 || total_compressed == 0 {
        return 0.0;
    }
    let pct = (1.0 - total_compressed as f64 / total_original as f64) * 100.0;
    (pct * 10.0).round() / 10.0
}

/// Human readable size with base-1024 units, e.g. `1.5 KB`.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    // f64's Display drops trailing zeros: 1.50 -> "1.5", 1.00 -> "1".
    format!("{} {}", rounded, UNITS[unit])
}
