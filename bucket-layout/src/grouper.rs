//! Grouping of object keys into logical tables.
//!
//! Every key of a listing is resolved on its own to a [`FilePlacement`]
//! (table name, classification, partition keys, subfolder) and then folded
//! into the [`TableGroup`] of that name. Because the final table name of a
//! key is decided before any group is touched, the resulting membership does
//! not depend on listing order.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::config::ScanConfig;
use crate::error::Result;
use crate::filter::PathFilter;
use crate::partition::{extract_partitions, PartitionSegment};
use crate::structure::FolderStructure;

/// Table name used when partitioning starts at the bucket root.
pub const PARTITIONED_FALLBACK_NAME: &str = "partitioned_data";

/// A logical table assembled from one or more object keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableGroup {
    pub name: String,
    /// Member keys in scan order
    pub files: Vec<String>,
    pub partition_keys: BTreeSet<String>,
    /// Relative folders found below the table's depth cutoff
    pub subfolders: BTreeSet<String>,
    pub folder_structure: FolderStructure,
}

impl TableGroup {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            files: Vec::new(),
            partition_keys: BTreeSet::new(),
            subfolders: BTreeSet::new(),
            folder_structure: FolderStructure::default(),
        }
    }

    /// The first file in scan order, used for schema inference.
    pub fn representative_file(&self) -> Option<&str> {
        self.files.first().map(String::as_str)
    }

    /// Lower-cased extension of the representative file.
    pub fn file_format(&self) -> Option<String> {
        self.representative_file().and_then(file_extension)
    }

    pub fn partition_keys(&self) -> Vec<&str> {
        self.partition_keys.iter().map(String::as_str).collect()
    }

    pub fn subfolders(&self) -> Vec<&str> {
        self.subfolders.iter().map(String::as_str).collect()
    }

    fn absorb(&mut self, key: &str, placement: FilePlacement) {
        self.files.push(key.to_string());
        self.partition_keys.extend(placement.partition_keys);
        if let Some(subfolder) = placement.subfolder {
            self.subfolders.insert(subfolder);
        }
        self.folder_structure = self.folder_structure.promote(placement.structure);
    }
}

/// Where a single key lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePlacement {
    pub table_name: String,
    pub structure: FolderStructure,
    pub partition_keys: Vec<String>,
    pub subfolder: Option<String>,
}

/// Outcome of resolving one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyDecision {
    /// Empty key or a `/`-terminated directory marker
    DirectoryMarker,
    /// Rejected by the include/exclude patterns
    Filtered,
    /// Extension not among the configured formats
    UnsupportedFormat,
    Placed(FilePlacement),
}

/// Counters describing one grouping pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingSummary {
    pub keys_seen: usize,
    pub directory_markers: usize,
    pub filtered_out: usize,
    pub unsupported_format: usize,
    pub grouped: usize,
}

/// Result of a grouping pass, ordered by table name.
#[derive(Debug, Clone, Default)]
pub struct Grouping {
    pub tables: BTreeMap<String, TableGroup>,
    pub summary: GroupingSummary,
}

impl Grouping {
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&TableGroup> {
        self.tables.get(name)
    }

    pub fn into_groups(self) -> Vec<TableGroup> {
        self.tables.into_values().collect()
    }
}

/// Groups object keys according to a [`ScanConfig`].
#[derive(Debug, Clone)]
pub struct TableGrouper<'a> {
    config: &'a ScanConfig,
    filter: PathFilter,
}

impl<'a> TableGrouper<'a> {
    pub fn new(config: &'a ScanConfig) -> Result<Self> {
        Ok(Self {
            config,
            filter: config.path_filter()?,
        })
    }

    /// Group a fully materialised listing.
    pub fn group<I, S>(&self, keys: I) -> Grouping
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut grouping = Grouping::default();

        for key in keys {
            let key = key.as_ref();
            grouping.summary.keys_seen += 1;

            match self.resolve(key) {
                KeyDecision::DirectoryMarker => grouping.summary.directory_markers += 1,
                KeyDecision::Filtered => grouping.summary.filtered_out += 1,
                KeyDecision::UnsupportedFormat => grouping.summary.unsupported_format += 1,
                KeyDecision::Placed(placement) => {
                    debug!(
                        key = key,
                        table = %placement.table_name,
                        structure = %placement.structure,
                        "Grouped file"
                    );
                    grouping.summary.grouped += 1;
                    grouping
                        .tables
                        .entry(placement.table_name.clone())
                        .or_insert_with(|| TableGroup::new(&placement.table_name))
                        .absorb(key, placement);
                }
            }
        }

        for (name, group) in &grouping.tables {
            info!(
                table = %name,
                files = group.files.len(),
                partitions = group.partition_keys.len(),
                subfolders = group.subfolders.len(),
                structure = %group.folder_structure,
                "Logical table"
            );
            if !group.subfolders.is_empty() {
                debug!(table = %name, subfolders = ?group.subfolders, "Table subfolders");
            }
        }

        grouping
    }

    /// Decide where a single key belongs.
    pub fn resolve(&self, key: &str) -> KeyDecision {
        if key.is_empty() || key.ends_with('/') {
            return KeyDecision::DirectoryMarker;
        }
        if !self.filter.matches(key) {
            return KeyDecision::Filtered;
        }
        match file_extension(key) {
            Some(ext) if self.config.supports_format(&ext) => {}
            _ => return KeyDecision::UnsupportedFormat,
        }

        // Empty segments ("a//b.csv", "/c.csv") carry no folder.
        let segments: Vec<&str> = key.split('/').filter(|s| !s.is_empty()).collect();
        let file_name = segments[segments.len() - 1];
        let base_name = strip_extension(file_name);

        let partitions: Vec<PartitionSegment> = if self.config.partition_parsing() {
            extract_partitions(&segments.join("/"))
        } else {
            Vec::new()
        };
        let first_partition = partitions.first().map(|p| p.position);

        let mut subfolder = None;
        let (mut table_name, mut structure) =
            if segments.len() > 1 && self.config.hierarchical_folders() {
                // Never past the last directory, never into a partition segment.
                let mut depth = self.config.folder_depth().min(segments.len() - 1);
                if let Some(position) = first_partition {
                    depth = depth.min(position);
                }

                if depth > 0 {
                    if self.config.subfolder_info() && segments.len() > depth + 1 {
                        subfolder = Some(segments[depth..segments.len() - 1].join("/"));
                    }
                    (segments[..depth].join("/"), FolderStructure::Hierarchical)
                } else {
                    (base_name.to_string(), FolderStructure::Flat)
                }
            } else {
                (base_name.to_string(), FolderStructure::Flat)
            };

        if let Some(position) = first_partition {
            structure = FolderStructure::Partitioned;
            if position == 0 {
                table_name = prefix_table_name(&segments[..position]);
            }
        }

        if table_name.is_empty() {
            table_name = PARTITIONED_FALLBACK_NAME.to_string();
        }

        KeyDecision::Placed(FilePlacement {
            table_name,
            structure,
            partition_keys: partitions.into_iter().map(|p| p.name).collect(),
            subfolder,
        })
    }
}

/// Group `keys` with a one-off [`TableGrouper`].
///
/// # Example
/// ```
/// use bucket_layout::{group_objects, FolderStructure, ScanConfig};
///
/// let keys = ["sales/2023/region=US/data.csv", "sales/2023/region=EU/data.csv"];
/// let grouping = group_objects(keys, &ScanConfig::default()).unwrap();
///
/// let sales = grouping.get("sales").unwrap();
/// assert_eq!(sales.files.len(), 2);
/// assert_eq!(sales.partition_keys(), ["region"]);
/// assert_eq!(sales.folder_structure, FolderStructure::Partitioned);
/// ```
pub fn group_objects<I, S>(keys: I, config: &ScanConfig) -> Result<Grouping>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Ok(TableGrouper::new(config)?.group(keys))
}

/// Lower-cased extension of the last path segment, if it has one.
///
/// Leading dots (`.hidden`) do not start an extension.
pub fn file_extension(key: &str) -> Option<String> {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    match file_name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < file_name.len() => {
            Some(file_name[idx + 1..].to_lowercase())
        }
        _ => None,
    }
}

fn strip_extension(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    }
}

/// Basename of the key prefix that precedes the first partition segment.
fn prefix_table_name(prefix: &[&str]) -> String {
    prefix
        .iter()
        .rev()
        .find(|segment| !segment.is_empty())
        .map(|segment| segment.to_string())
        .unwrap_or_else(|| PARTITIONED_FALLBACK_NAME.to_string())
}
