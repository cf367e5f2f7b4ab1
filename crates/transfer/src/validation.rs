use crate::TransferError;

/// Validates an absolute remote path.
///
/// Rejects:
/// - Empty paths
/// - Relative paths (the service addresses everything from `/`)
/// - Parent directory segments (`..`)
/// - Backslashes, which the service treats as literal characters
pub fn validate_remote_path(remote: &str) -> Result<(), TransferError> {
    if remote.is_empty() {
        return Err(TransferError::InvalidPath("empty path".into()));
    }
    if !remote.starts_with('/') {
        return Err(TransferError::InvalidPath(format!(
            "remote path must be absolute: {remote}"
        )));
    }
    if remote.contains('\\') {
        return Err(TransferError::InvalidPath(format!(
            "backslash not allowed: {remote}"
        )));
    }
    if remote.split('/').any(|seg| seg == "..") {
        return Err(TransferError::InvalidPath(format!(
            "parent directory traversal not allowed: {remote}"
        )));
    }
    Ok(())
}

/// Joins a relative path (forward slashes) onto a remote root.
///
/// Trailing slashes on `root` are dropped so `"/a/"` and `"/a"` give the same result.
pub fn join_remote(root: &str, relative: &str) -> String {
    let relative = relative.trim_start_matches('/');
    format!("{}/{}", root.trim_end_matches('/'), relative)
}
