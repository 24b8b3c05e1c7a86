use std::path::PathBuf;

/// Why a config could not be loaded. A failed load never touches the session's graph or history.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("root element <{root}> is not an AutoDrive config")]
    UnknownConfig { root: String },
    #[error("required element <{0}> is missing")]
    MissingElement(String),
    #[error("{field} has {found} entries but <id> has {expected}")]
    EntryCountMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("{field} entry {index} is not a number: {value:?}")]
    InvalidNumber {
        field: &'static str,
        index: usize,
        value: String,
    },
    #[error("{field} entry {index} refers to node {value}, outside 1..={count}")]
    InvalidReference {
        field: &'static str,
        index: usize,
        value: i64,
        count: usize,
    },
    #[error("{field} entry {index} is outside the world bounds: {value}")]
    CoordinateOutOfRange {
        field: &'static str,
        index: usize,
        value: f64,
    },
    #[error("{what} exceeds the limit of {limit}")]
    LimitExceeded { what: &'static str, limit: usize },
}

impl LoadError {
    pub fn code(&self) -> &'static str {
        match self {
            LoadError::Io { .. } => "io",
            LoadError::Xml(_) => "malformed_xml",
            LoadError::UnknownConfig { .. } => "unknown_config",
            LoadError::MissingElement(_) => "missing_element",
            LoadError::EntryCountMismatch { .. } => "entry_count_mismatch",
            LoadError::InvalidNumber { .. } => "invalid_number",
            LoadError::InvalidReference { .. } => "invalid_reference",
            LoadError::CoordinateOutOfRange { .. } => "out_of_range",
            LoadError::LimitExceeded { .. } => "limit_exceeded",
        }
    }
}

/// Why a save or auto-save did not happen. The stale flag is left as it was.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed XML in {path}: {source}")]
    Xml {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },
    #[error("root element <{root}> is not an AutoDrive config")]
    UnknownConfig { root: String },
    #[error("no config is loaded")]
    NoConfigLoaded,
    #[error("{0} is a directory")]
    IsDirectory(PathBuf),
    #[error("{0} is read-only")]
    ReadOnly(PathBuf),
    #[error("legacy configs can be viewed but not saved")]
    ReadOnlyConfig,
    #[error("auto-save is suspended while an edit is in progress")]
    AutoSaveSuspended,
}

impl SaveError {
    pub fn code(&self) -> &'static str {
        match self {
            SaveError::Io { .. } => "io",
            SaveError::Xml { .. } => "malformed_xml",
            SaveError::UnknownConfig { .. } => "unknown_config",
            SaveError::NoConfigLoaded => "no_config",
            SaveError::IsDirectory(_) => "is_directory",
            SaveError::ReadOnly(_) => "read_only",
            SaveError::ReadOnlyConfig => "read_only_config",
            SaveError::AutoSaveSuspended => "autosave_suspended",
        }
    }

    /// Conditions another process or a finished edit may clear: a suspension, or a target that is
    /// locked, read-only or shadowed by a directory.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SaveError::AutoSaveSuspended
                | SaveError::IsDirectory(_)
                | SaveError::ReadOnly(_)
                | SaveError::Io { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_names_field() {
        let e = LoadError::EntryCountMismatch {
            field: "<z>",
            expected: 4,
            found: 3,
        };
        assert_eq!(e.code(), "entry_count_mismatch");
        assert_eq!(e.to_string(), "<z> has 3 entries but <id> has 4");
    }

    #[test]
    fn test_retryable_save_errors() {
        assert!(SaveError::IsDirectory(PathBuf::from("a.xml")).is_retryable());
        assert!(SaveError::ReadOnly(PathBuf::from("a.xml")).is_retryable());
        assert!(SaveError::AutoSaveSuspended.is_retryable());
        assert!(SaveError::Io {
            path: PathBuf::from("a.xml"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked"),
        }
        .is_retryable());
        assert!(!SaveError::ReadOnlyConfig.is_retryable());
        assert!(!SaveError::NoConfigLoaded.is_retryable());
    }
}
