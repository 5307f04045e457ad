use std::fmt;

/// How the files of a logical table are laid out in the key namespace.
///
/// Classification follows a small state machine. Each newly grouped file
/// proposes the classification it implies and the group moves to it, except
/// that `Partitioned` is absorbing: once reached, nothing moves a group back
/// to `Flat` or `Hierarchical`.
///
/// ```text
///   Flat <-> Hierarchical
///     \         /
///      v       v
///     Partitioned (absorbing)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FolderStructure {
    #[default]
    Flat,
    Hierarchical,
    Partitioned,
    Mixed,
}

impl FolderStructure {
    /// Apply the classification implied by the next file of a group.
    pub fn promote(self, next: FolderStructure) -> FolderStructure {
        match self {
            FolderStructure::Partitioned => FolderStructure::Partitioned,
            _ => next,
        }
    }

    /// Position in the promotion order; only `Partitioned` ranks above the rest.
    pub fn rank(self) -> u8 {
        match self {
            FolderStructure::Partitioned => 1,
            _ => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FolderStructure::Flat => "flat",
            FolderStructure::Hierarchical => "hierarchical",
            FolderStructure::Partitioned => "partitioned",
            FolderStructure::Mixed => "mixed",
        }
    }

    /// Capitalised name used in table descriptions.
    pub fn title(self) -> &'static str {
        match self {
            FolderStructure::Flat => "Flat",
            FolderStructure::Hierarchical => "Hierarchical",
            FolderStructure::Partitioned => "Partitioned",
            FolderStructure::Mixed => "Mixed",
        }
    }
}

impl fmt::Display for FolderStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [FolderStructure; 4] = [
        FolderStructure::Flat,
        FolderStructure::Hierarchical,
        FolderStructure::Partitioned,
        FolderStructure::Mixed,
    ];

    #[test]
    fn test_last_classification_wins_before_partitioning() {
        assert_eq!(
            FolderStructure::Flat.promote(FolderStructure::Hierarchical),
            FolderStructure::Hierarchical
        );
        assert_eq!(
            FolderStructure::Hierarchical.promote(FolderStructure::Flat),
            FolderStructure::Flat
        );
    }

    #[test]
    fn test_partitioned_is_absorbing() {
        for next in ALL {
            assert_eq!(
                FolderStructure::Partitioned.promote(next),
                FolderStructure::Partitioned
            );
        }
    }

    #[test]
    fn test_promotion_never_lowers_rank() {
        for current in ALL {
            for next in ALL {
                let promoted = current.promote(next);
                assert!(promoted.rank() >= current.rank());
            }
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(FolderStructure::Hierarchical.to_string(), "hierarchical");
        assert_eq!(FolderStructure::Partitioned.title(), "Partitioned");
    }
}
