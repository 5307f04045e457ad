// Object key grouping engine: turns a flat bucket listing into logical tables

pub mod config;
pub mod description;
pub mod error;
pub mod filter;
pub mod grouper;
pub mod partition;
pub mod structure;
pub mod tags;

pub use config::{ScanConfig, TagRule};
pub use description::describe;
pub use error::{Error, Result};
pub use filter::PathFilter;
pub use grouper::{
    file_extension, group_objects, FilePlacement, Grouping, GroupingSummary, KeyDecision,
    TableGroup, TableGrouper, PARTITIONED_FALLBACK_NAME,
};
pub use partition::{extract_partitions, PartitionSegment};
pub use structure::FolderStructure;
pub use tags::{complexity_tag, structure_tag, tags_for, TagSource, TableTag};
