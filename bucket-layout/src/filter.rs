//! Include/exclude regex filtering of object keys.

use regex::Regex;

use crate::error::{Error, Result};

/// Regex filter applied to full object keys before grouping.
///
/// A key passes when it matches the include pattern (if any) and does not
/// match the exclude pattern (if any). Patterns are searched, not anchored,
/// so `raw/` matches anywhere in the key.
///
/// # Example
/// ```
/// use bucket_layout::PathFilter;
///
/// let filter = PathFilter::new(Some("^data/"), Some("_tmp")).unwrap();
/// assert!(filter.matches("data/users/part-0.csv"));
/// assert!(!filter.matches("data/users/_tmp/part-0.csv"));
/// assert!(!filter.matches("logs/app.json"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    include: Option<Regex>,
    exclude: Option<Regex>,
}

impl PathFilter {
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Result<Self> {
        Ok(Self {
            include: include.map(compile).transpose()?,
            exclude: exclude.map(compile).transpose()?,
        })
    }

    /// A filter that lets every key through.
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn matches(&self, key: &str) -> bool {
        if let Some(include) = &self.include {
            if !include.is_match(key) {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(key) {
                return false;
            }
        }
        true
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}
