//! Cache key derivation for command invocations

use crate::{Error, Result};
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::fmt;

/// Length of the human-facing short identifier
pub const SHORT_HASH_LEN: usize = 7;

/// SHA-256 hex digest of a space-joined command line.
///
/// Every file belonging to a cache entry uses the key as its stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a full argv (program name plus arguments).
    ///
    /// Fails with [`Error::HashFailure`] if argv is empty or any element is
    /// not valid UTF-8.
    pub fn derive(argv: &[OsString]) -> Result<Self> {
        Ok(Self::from_command_line(&join_command_line(argv)?))
    }

    /// Hash an already joined command line
    #[must_use]
    pub fn from_command_line(command_line: &str) -> Self {
        let digest = Sha256::digest(command_line.as_bytes());
        Self(hex::encode(digest))
    }

    /// Full hex digest
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First seven hex characters, as shown by `--list-caches`
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..SHORT_HASH_LEN]
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Join argv with single spaces, in order.
pub fn join_command_line(argv: &[OsString]) -> Result<String> {
    if argv.is_empty() {
        return Err(Error::hash_failure("empty command"));
    }

    let parts = argv
        .iter()
        .map(|arg| {
            arg.to_str().ok_or_else(|| {
                Error::hash_failure(format!(
                    "argument is not valid UTF-8: {}",
                    arg.to_string_lossy()
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<OsString> {
        parts.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_known_digest() {
        let key = CacheKey::derive(&argv(&["this", "is", "a", "command", "to", "checksum"])).unwrap();
        assert_eq!(
            key.as_str(),
            "7e3486e5ce8bb7e869725d154a240090c139e335f182fbc5618177165ebaf2c1"
        );
        assert_eq!(key.short(), "7e3486e");
    }

    #[test]
    fn test_same_argv_same_key() {
        let a = CacheKey::derive(&argv(&["/bin/ls", "-l", "/tmp"])).unwrap();
        let b = CacheKey::derive(&argv(&["/bin/ls", "-l", "/tmp"])).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, CacheKey::from_command_line("/bin/ls -l /tmp"));
    }

    #[test]
    fn test_argv_differences_change_key() {
        let base = CacheKey::derive(&argv(&["ls", "-l", "-a"])).unwrap();
        let reordered = CacheKey::derive(&argv(&["ls", "-a", "-l"])).unwrap();
        let extra = CacheKey::derive(&argv(&["ls", "-l", "-a", "-h"])).unwrap();
        let spaced = CacheKey::derive(&argv(&["ls", "-l ", "-a"])).unwrap();
        assert_ne!(base, reordered);
        assert_ne!(base, extra);
        assert_ne!(base, spaced);
    }

    #[test]
    fn test_empty_argv_is_hash_failure() {
        assert!(matches!(
            CacheKey::derive(&[]),
            Err(Error::HashFailure { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_argument_is_hash_failure() {
        use std::os::unix::ffi::OsStringExt;

        let bad = OsString::from_vec(vec![b'f', 0xff, b'o']);
        let result = CacheKey::derive(&[OsString::from("echo"), bad]);
        assert!(matches!(result, Err(Error::HashFailure { .. })));
    }
}
