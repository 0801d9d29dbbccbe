use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Ratio of documented records to coverable records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceCoverage {
    pub expect_count: usize,
    pub actual_count: usize,
    /// Per-file breakdown, present when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<BTreeMap<String, FileCoverage>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileCoverage {
    pub expect_count: usize,
    pub actual_count: usize,
    /// Sorted line numbers of undocumented records.
    pub undocumented_lines: Vec<u32>,
}

/// `floor(10000 * actual / expect) / 100`, or 0 when nothing is expected.
pub fn coverage_percent(actual: usize, expect: usize) -> f64 {
    if expect == 0 {
        return 0.0;
    }
    ((10_000 * actual as u64) / expect as u64) as f64 / 100.0
}

impl SourceCoverage {
    pub fn percent(&self) -> f64 {
        coverage_percent(self.actual_count, self.expect_count)
    }
}

impl FileCoverage {
    pub fn percent(&self) -> f64 {
        coverage_percent(self.actual_count, self.expect_count)
    }
}

impl fmt::Display for SourceCoverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2}% ({}/{})",
            self.percent(),
            self.actual_count,
            self.expect_count
        )
    }
}

impl fmt::Display for FileCoverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2}% ({}/{})",
            self.percent(),
            self.actual_count,
            self.expect_count
        )
    }
}
