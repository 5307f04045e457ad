//! Hive-style `key=value` partition detection in object keys.

use std::sync::OnceLock;

use regex::Regex;

/// One `name=value` directory segment of an object key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSegment {
    /// Index of the segment within the `/`-split key
    pub position: usize,
    pub name: String,
    pub value: String,
}

fn segment_regex() -> &'static Regex {
    static SEGMENT: OnceLock<Regex> = OnceLock::new();
    // A whole directory segment: non-empty name without '=', non-empty value.
    SEGMENT.get_or_init(|| Regex::new(r"^([^/=]+)=([^/]+)$").expect("static regex"))
}

/// Extract the partition segments of a key, in path order.
///
/// Only directory segments are considered; an `=` inside the final filename
/// (`exports/a=b.csv`) is not a partition.
///
/// # Example
/// ```
/// use bucket_layout::extract_partitions;
///
/// let parts = extract_partitions("sales/year=2024/month=01/data.csv");
/// let names: Vec<_> = parts.iter().map(|p| p.name.as_str()).collect();
/// assert_eq!(names, ["year", "month"]);
/// assert_eq!(parts[1].value, "01");
/// ```
pub fn extract_partitions(key: &str) -> Vec<PartitionSegment> {
    let segments: Vec<&str> = key.split('/').collect();
    let directory_count = segments.len().saturating_sub(1);

    segments[..directory_count]
        .iter()
        .enumerate()
        .filter_map(|(position, segment)| {
            segment_regex().captures(segment).map(|caps| PartitionSegment {
                position,
                name: caps[1].to_string(),
                value: caps[2].to_string(),
            })
        })
        .collect()
}
