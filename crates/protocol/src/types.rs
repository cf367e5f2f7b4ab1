use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Rule the service applies when the target path already exists.
///
/// Sent as `rtype`; the same value must be used at announce and finalize
/// time for one upload attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Rename the new file when the path is taken (`rtype=1`).
    #[default]
    Rename,
    /// Rename only when the path is taken and the block list differs (`rtype=2`).
    RenameOnMismatch,
    /// Replace the existing file (`rtype=3`).
    Overwrite,
}

impl ConflictPolicy {
    /// Wire value for the `rtype` parameter.
    pub fn rtype(self) -> u8 {
        match self {
            Self::Rename => 1,
            Self::RenameOnMismatch => 2,
            Self::Overwrite => 3,
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Rename => "rename",
            Self::RenameOnMismatch => "rename-on-mismatch",
            Self::Overwrite => "overwrite",
        };
        f.write_str(s)
    }
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rename" | "1" => Ok(Self::Rename),
            "rename-on-mismatch" | "2" => Ok(Self::RenameOnMismatch),
            "overwrite" | "3" => Ok(Self::Overwrite),
            other => Err(format!("unknown conflict policy: {other}")),
        }
    }
}

/// Upload origin reported at finalize time (`mode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadMode {
    Manual,
    Batch,
    FileBackup,
    AlbumBackup,
    VideoBackup,
}

impl UploadMode {
    /// Wire value for the `mode` parameter.
    pub fn code(self) -> u8 {
        match self {
            Self::Manual => 1,
            Self::Batch => 2,
            Self::FileBackup => 3,
            Self::AlbumBackup => 4,
            Self::VideoBackup => 5,
        }
    }
}

/// Operation performed by the file manager endpoint (`opera`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOperation {
    Copy,
    Move,
    Rename,
    Delete,
}

impl FileOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Move => "move",
            Self::Rename => "rename",
            Self::Delete => "delete",
        }
    }
}

/// Duplicate handling for file manager operations (`ondup`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnDuplicate {
    #[default]
    Fail,
    Newcopy,
    Overwrite,
    Skip,
}

impl OnDuplicate {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fail => "fail",
            Self::Newcopy => "newcopy",
            Self::Overwrite => "overwrite",
            Self::Skip => "skip",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_policy_rtype_values() {
        assert_eq!(ConflictPolicy::Rename.rtype(), 1);
        assert_eq!(ConflictPolicy::RenameOnMismatch.rtype(), 2);
        assert_eq!(ConflictPolicy::Overwrite.rtype(), 3);
    }

    #[test]
    fn conflict_policy_parses_names_and_codes() {
        assert_eq!("overwrite".parse::<ConflictPolicy>().unwrap(), ConflictPolicy::Overwrite);
        assert_eq!("2".parse::<ConflictPolicy>().unwrap(), ConflictPolicy::RenameOnMismatch);
        assert!("replace".parse::<ConflictPolicy>().is_err());
    }

    #[test]
    fn conflict_policy_display_parses_back() {
        for p in [
            ConflictPolicy::Rename,
            ConflictPolicy::RenameOnMismatch,
            ConflictPolicy::Overwrite,
        ] {
            assert_eq!(p.to_string().parse::<ConflictPolicy>().unwrap(), p);
        }
    }

    #[test]
    fn conflict_policy_serde_name() {
        assert_eq!(
            serde_json::to_string(&ConflictPolicy::RenameOnMismatch).unwrap(),
            "\"rename-on-mismatch\""
        );
    }

    #[test]
    fn upload_mode_codes() {
        assert_eq!(UploadMode::Manual.code(), 1);
        assert_eq!(UploadMode::VideoBackup.code(), 5);
    }
}
