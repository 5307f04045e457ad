use crate::grouper::TableGroup;
use crate::structure::FolderStructure;

const MAX_SUBFOLDER_EXAMPLES: usize = 5;
const MAX_PATH_EXAMPLES: usize = 3;

/// Render the markdown description of a logical table.
///
/// Sections, in order: structure heading, file count and format, partition
/// keys, structure-specific details, example paths.
pub fn describe(group: &TableGroup, file_format: &str) -> String {
    let format = file_format.to_uppercase();
    let structure = group.folder_structure;
    let file_count = group.files.len();

    let mut lines = vec![
        format!("**{} Structure Table**", structure.title()),
        format!("- **Files**: {} {} file(s)", file_count, format),
        format!("- **Format**: {}", format),
    ];

    if group.partition_keys.is_empty() {
        lines.push("- **Partitions**: None".to_string());
    } else {
        lines.push(format!("- **Partitions**: {}", group.partition_keys().join(", ")));
    }

    match structure {
        FolderStructure::Hierarchical => {
            let subfolders = group.subfolders();
            if subfolders.is_empty() {
                lines.push("- **Subfolders**: Files in root level of table folder".to_string());
            } else {
                lines.push(format!("- **Subfolders**: {} level(s)", subfolders.len()));
                let shown = subfolders.len().min(MAX_SUBFOLDER_EXAMPLES);
                lines.push(format!("  - {}", subfolders[..shown].join(", ")));
                if subfolders.len() > shown {
                    lines.push(format!("  - ... and {} more", subfolders.len() - shown));
                }
            }
        }
        FolderStructure::Flat => {
            lines.push("- **Structure**: Files directly in bucket root".to_string());
        }
        FolderStructure::Partitioned => {
            lines.push("- **Structure**: Hive-style partitioned data".to_string());
        }
        FolderStructure::Mixed => {}
    }

    if file_count > 0 {
        lines.push("- **Sample Paths**:".to_string());
        for path in group.files.iter().take(MAX_PATH_EXAMPLES) {
            lines.push(format!("  - `{}`", path));
        }
        if file_count > MAX_PATH_EXAMPLES {
            lines.push(format!(
                "  - ... and {} more files",
                file_count - MAX_PATH_EXAMPLES
            ));
        }
    }

    lines.join("\n")
}
