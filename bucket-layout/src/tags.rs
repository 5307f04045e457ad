//! Tag assignment for logical tables.

use crate::config::ScanConfig;
use crate::structure::FolderStructure;

/// Why a tag was attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagSource {
    /// A configured path keyword matched
    PathRule,
    /// Configured to apply to every table
    Default,
    /// Derived from the folder layout
    Structural,
}

impl TagSource {
    /// Structural tags are computed, the rest are configured by hand.
    pub fn is_automated(self) -> bool {
        matches!(self, TagSource::Structural)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableTag {
    pub id: String,
    pub source: TagSource,
}

impl TableTag {
    fn new(id: impl Into<String>, source: TagSource) -> Self {
        Self {
            id: id.into(),
            source,
        }
    }
}

pub fn structure_tag(structure: FolderStructure) -> &'static str {
    match structure {
        FolderStructure::Flat => "Structure.Flat",
        FolderStructure::Hierarchical => "Structure.Hierarchical",
        FolderStructure::Partitioned => "Structure.Partitioned",
        FolderStructure::Mixed => "Structure.Mixed",
    }
}

/// Complexity bucket for a table with `subfolder_count` subfolders.
pub fn complexity_tag(subfolder_count: usize) -> Option<&'static str> {
    match subfolder_count {
        0 => None,
        1..=3 => Some("Complexity.Simple"),
        4..=10 => Some("Complexity.Moderate"),
        _ => Some("Complexity.Complex"),
    }
}

/// Tags for a table, in application order: matching path rules (declaration
/// order, duplicates kept), default tags, the structure tag, then the
/// complexity tag when the table has subfolders.
///
/// # Example
/// ```
/// use bucket_layout::{tags_for, FolderStructure, ScanConfig, TagRule};
///
/// let config = ScanConfig::new().with_tag_rule(TagRule::new("pii", "PII.Sensitive"));
/// let tags = tags_for(&config, "users/pii/data.csv", FolderStructure::Hierarchical, 1);
/// let ids: Vec<_> = tags.iter().map(|t| t.id.as_str()).collect();
/// assert_eq!(ids, ["PII.Sensitive", "Structure.Hierarchical", "Complexity.Simple"]);
/// ```
pub fn tags_for(
    config: &ScanConfig,
    representative_path: &str,
    structure: FolderStructure,
    subfolder_count: usize,
) -> Vec<TableTag> {
    let mut tags: Vec<TableTag> = config
        .tag_rules()
        .iter()
        .filter(|rule| !rule.tag_id.is_empty() && rule.matches(representative_path))
        .map(|rule| TableTag::new(rule.tag_id.clone(), TagSource::PathRule))
        .collect();

    tags.extend(
        config
            .default_tags()
            .iter()
            .map(|tag| TableTag::new(tag.clone(), TagSource::Default)),
    );

    tags.push(TableTag::new(structure_tag(structure), TagSource::Structural));

    if let Some(complexity) = complexity_tag(subfolder_count) {
        tags.push(TableTag::new(complexity, TagSource::Structural));
    }

    tags
}
