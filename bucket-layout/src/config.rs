//! Scan configuration for the grouping engine.
//!
//! A [`ScanConfig`] is built once per run, either through the builder methods
//! or from the string option map a connector receives
//! (see [`ScanConfig::from_options`]), and is never mutated afterwards.

use std::collections::HashMap;

use tracing::warn;

use crate::error::{Error, Result};
use crate::filter::PathFilter;

pub const DEFAULT_FILE_FORMATS: &str = "csv,json,parquet,tsv";
pub const DEFAULT_SAMPLE_SIZE: usize = 50;
pub const MAX_SAMPLE_SIZE: usize = 1000;
pub const DEFAULT_FOLDER_DEPTH: usize = 1;
pub const MAX_FOLDER_DEPTH: usize = 5;

/// Option names recognised by [`ScanConfig::from_options`].
pub mod options {
    pub const FILE_FORMATS: &str = "file_formats";
    pub const ENABLE_PARTITION_PARSING: &str = "enable_partition_parsing";
    pub const SAMPLE_SIZE: &str = "sample_size";
    pub const TAG_MAPPING: &str = "tag_mapping";
    pub const DEFAULT_TAGS: &str = "default_tags";
    pub const INCLUDE_PATH_PATTERN: &str = "includePathPattern";
    pub const EXCLUDE_PATH_PATTERN: &str = "excludePathPattern";
    pub const ENABLE_HIERARCHICAL_FOLDERS: &str = "enableHierarchicalFolders";
    pub const FOLDER_DEPTH_FOR_TABLES: &str = "folderDepthForTables";
    pub const INCLUDE_SUBFOLDER_INFO: &str = "includeSubfolderInfo";
}

/// A path keyword that attaches a tag to every table whose representative
/// file path contains it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRule {
    pub path_keyword: String,
    pub tag_id: String,
}

impl TagRule {
    pub fn new(path_keyword: impl Into<String>, tag_id: impl Into<String>) -> Self {
        Self {
            path_keyword: path_keyword.into(),
            tag_id: tag_id.into(),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        !self.path_keyword.is_empty() && path.contains(&self.path_keyword)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    formats: Vec<String>,
    enable_partition_parsing: bool,
    sample_size: usize,
    enable_hierarchical_folders: bool,
    folder_depth_for_tables: usize,
    include_subfolder_info: bool,
    include_path_pattern: Option<String>,
    exclude_path_pattern: Option<String>,
    tag_rules: Vec<TagRule>,
    default_tags: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            formats: parse_list(DEFAULT_FILE_FORMATS, true),
            enable_partition_parsing: true,
            sample_size: DEFAULT_SAMPLE_SIZE,
            enable_hierarchical_folders: true,
            folder_depth_for_tables: DEFAULT_FOLDER_DEPTH,
            include_subfolder_info: true,
            include_path_pattern: None,
            exclude_path_pattern: None,
            tag_rules: Vec::new(),
            default_tags: Vec::new(),
        }
    }
}

impl ScanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from connector options.
    ///
    /// Unknown keys are ignored. Numeric values that cannot be parsed fall back
    /// to their defaults and out-of-range values are clamped, both with a
    /// warning. Include/exclude patterns are compiled eagerly so an invalid
    /// regex fails here, before any listing happens.
    ///
    /// # Example
    /// ```
    /// use std::collections::HashMap;
    /// use bucket_layout::ScanConfig;
    ///
    /// let mut opts = HashMap::new();
    /// opts.insert("file_formats".to_string(), "CSV, json".to_string());
    /// opts.insert("sample_size".to_string(), "not-a-number".to_string());
    ///
    /// let config = ScanConfig::from_options(&opts).unwrap();
    /// assert_eq!(config.formats(), ["csv", "json"]);
    /// assert_eq!(config.sample_size(), 50);
    /// ```
    pub fn from_options(opts: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| opts.get(key).map(String::as_str);

        let formats = parse_list(get(options::FILE_FORMATS).unwrap_or(DEFAULT_FILE_FORMATS), true);

        let config = Self {
            formats,
            enable_partition_parsing: parse_bool(get(options::ENABLE_PARTITION_PARSING), true),
            sample_size: parse_bounded(
                options::SAMPLE_SIZE,
                get(options::SAMPLE_SIZE),
                DEFAULT_SAMPLE_SIZE,
                1,
                MAX_SAMPLE_SIZE,
            ),
            enable_hierarchical_folders: parse_bool(get(options::ENABLE_HIERARCHICAL_FOLDERS), true),
            folder_depth_for_tables: parse_bounded(
                options::FOLDER_DEPTH_FOR_TABLES,
                get(options::FOLDER_DEPTH_FOR_TABLES),
                DEFAULT_FOLDER_DEPTH,
                1,
                MAX_FOLDER_DEPTH,
            ),
            include_subfolder_info: parse_bool(get(options::INCLUDE_SUBFOLDER_INFO), true),
            include_path_pattern: non_empty(get(options::INCLUDE_PATH_PATTERN)),
            exclude_path_pattern: non_empty(get(options::EXCLUDE_PATH_PATTERN)),
            tag_rules: get(options::TAG_MAPPING).map(parse_tag_mapping).unwrap_or_default(),
            default_tags: parse_list(get(options::DEFAULT_TAGS).unwrap_or(""), false),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check invariants that the builder methods cannot enforce on their own.
    pub fn validate(&self) -> Result<()> {
        if self.formats.is_empty() {
            return Err(Error::Config(
                "at least one file format must be configured".to_string(),
            ));
        }
        self.path_filter()?;
        Ok(())
    }

    /// Compile the include/exclude patterns.
    pub fn path_filter(&self) -> Result<PathFilter> {
        PathFilter::new(
            self.include_path_pattern.as_deref(),
            self.exclude_path_pattern.as_deref(),
        )
    }

    pub fn with_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined: Vec<String> = formats.into_iter().map(|f| f.as_ref().to_string()).collect();
        self.formats = parse_list(&joined.join(","), true);
        self
    }

    pub fn with_partition_parsing(mut self, enabled: bool) -> Self {
        self.enable_partition_parsing = enabled;
        self
    }

    /// Set the sample row count, clamped to `1..=1000`.
    pub fn with_sample_size(mut self, size: usize) -> Self {
        self.sample_size = size.clamp(1, MAX_SAMPLE_SIZE);
        self
    }

    pub fn with_hierarchical_folders(mut self, enabled: bool) -> Self {
        self.enable_hierarchical_folders = enabled;
        self
    }

    /// Set how many leading folders name a table, clamped to `1..=5`.
    pub fn with_folder_depth(mut self, depth: usize) -> Self {
        self.folder_depth_for_tables = depth.clamp(1, MAX_FOLDER_DEPTH);
        self
    }

    pub fn with_subfolder_info(mut self, enabled: bool) -> Self {
        self.include_subfolder_info = enabled;
        self
    }

    pub fn with_include_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.include_path_pattern = Some(pattern.into());
        self
    }

    pub fn with_exclude_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_path_pattern = Some(pattern.into());
        self
    }

    pub fn with_tag_rule(mut self, rule: TagRule) -> Self {
        self.tag_rules.push(rule);
        self
    }

    pub fn with_default_tag(mut self, tag: impl Into<String>) -> Self {
        self.default_tags.push(tag.into());
        self
    }

    pub fn formats(&self) -> &[String] {
        &self.formats
    }

    pub fn supports_format(&self, extension: &str) -> bool {
        self.formats.iter().any(|f| f == extension)
    }

    pub fn partition_parsing(&self) -> bool {
        self.enable_partition_parsing
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn hierarchical_folders(&self) -> bool {
        self.enable_hierarchical_folders
    }

    pub fn folder_depth(&self) -> usize {
        self.folder_depth_for_tables
    }

    pub fn subfolder_info(&self) -> bool {
        self.include_subfolder_info
    }

    pub fn include_pattern(&self) -> Option<&str> {
        self.include_path_pattern.as_deref()
    }

    pub fn exclude_pattern(&self) -> Option<&str> {
        self.exclude_path_pattern.as_deref()
    }

    pub fn tag_rules(&self) -> &[TagRule] {
        &self.tag_rules
    }

    pub fn default_tags(&self) -> &[String] {
        &self.default_tags
    }
}

/// Parse `keyword1:tag1;keyword2:tag2` into ordered rules.
pub fn parse_tag_mapping(mapping: &str) -> Vec<TagRule> {
    let mut rules = Vec::new();
    for rule in mapping.split(';') {
        if rule.trim().is_empty() {
            continue;
        }
        match rule.split_once(':') {
            Some((keyword, tag)) => rules.push(TagRule::new(keyword.trim(), tag.trim())),
            None => warn!(rule = rule, "Ignoring tag mapping rule without ':' separator"),
        }
    }
    rules
}

fn parse_list(value: &str, lowercase: bool) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for item in value.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let item = if lowercase {
            item.to_lowercase()
        } else {
            item.to_string()
        };
        // Formats form an ordered set; tags keep duplicates as configured.
        if lowercase && items.contains(&item) {
            continue;
        }
        items.push(item);
    }
    items
}

fn parse_bool(value: Option<&str>, default: bool) -> bool {
    value
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn parse_bounded(key: &str, value: Option<&str>, default: usize, min: usize, max: usize) -> usize {
    let Some(raw) = value else {
        return default;
    };
    match raw.trim().parse::<i64>() {
        Ok(parsed) => {
            let clamped = parsed.clamp(min as i64, max as i64) as usize;
            if clamped as i64 != parsed {
                warn!(
                    option = key,
                    value = parsed,
                    clamped = clamped,
                    "Option out of range, clamping"
                );
            }
            clamped
        }
        Err(_) => {
            warn!(option = key, value = raw, default = default, "Invalid numeric option, using default");
            default
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
