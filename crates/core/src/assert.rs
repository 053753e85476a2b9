//! Matchers over captured command output
//!
//! All matchers are pure functions over a [`CommandResult`]'s output text.
//! Substring matchers are exact literal tests, never patterns: the snippets
//! being checked (a filesystem size string like `976M`, a mount-table line)
//! must match byte-for-byte.

use voltest_runner::CommandResult;

use crate::error::{Error, Result};

/// Assert that the output contains `needle` as a literal substring
pub fn contains(result: &CommandResult, needle: &str) -> Result<()> {
    if result.output().contains(needle) {
        Ok(())
    } else {
        Err(Error::assertion(
            format!("output to contain {needle:?}"),
            result.output(),
        ))
    }
}

/// Assert that the output does not contain `needle` as a literal substring
pub fn does_not_contain(result: &CommandResult, needle: &str) -> Result<()> {
    if result.output().contains(needle) {
        Err(Error::assertion(
            format!("output to not contain {needle:?}"),
            result.output(),
        ))
    } else {
        Ok(())
    }
}

/// Assert that the output reports a filesystem size of `size`
///
/// Matches `size` as a whole whitespace-separated token, tolerating exactly
/// one unit variance: the binary-suffix spelling with a trailing `i`
/// (`976M` also matches a `976Mi` token, as printed by `df -h` on systems
/// with newer coreutils). No other unit conversion is attempted.
pub fn contains_size(result: &CommandResult, size: &str) -> Result<()> {
    let binary = format!("{size}i");
    let found = result
        .output()
        .split_whitespace()
        .any(|token| token == size || token == binary);
    if found {
        Ok(())
    } else {
        Err(Error::assertion(
            format!("a size column equal to {size:?}"),
            result.output(),
        ))
    }
}

/// Assert that the command failed
///
/// This is the explicit expected-failure contract for scenarios that probe
/// denials (e.g. an NFS export that must refuse a non-allowed client). The
/// expected signal is a non-zero exit code; callers wanting to pin down the
/// denial text additionally use [`contains`] on the same result.
pub fn expect_failure(result: &CommandResult) -> Result<()> {
    if result.succeeded() {
        Err(Error::assertion(
            "command to fail with a non-zero exit code".to_string(),
            result.output(),
        ))
    } else {
        Ok(())
    }
}

/// One line of `mount` output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    /// The mounted source (device node or `host:path` spec)
    pub source: String,
    /// The mount point
    pub target: String,
    /// Filesystem type, when present
    pub fstype: Option<String>,
}

/// Parsed view of the textual mount table
///
/// Understands `source on target type fstype (options)` lines, tolerating
/// extra whitespace and unknown trailing columns. Source comparisons are
/// full-token equality, so testing for `10.1.1.233:///data` is never confused
/// by an unrelated `10.1.1.233:///data2` entry.
#[derive(Debug, Default)]
pub struct MountTable {
    entries: Vec<MountEntry>,
}

impl MountTable {
    /// Parse `mount` output, skipping lines that do not look like entries
    pub fn parse(output: &str) -> Self {
        let mut entries = Vec::new();
        for line in output.lines() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() < 3 || tokens[1] != "on" {
                continue;
            }
            let fstype = match (tokens.get(3), tokens.get(4)) {
                (Some(&"type"), Some(fstype)) => Some(fstype.to_string()),
                _ => None,
            };
            entries.push(MountEntry {
                source: tokens[0].to_string(),
                target: tokens[2].to_string(),
                fstype,
            });
        }
        Self { entries }
    }

    /// All parsed entries
    pub fn entries(&self) -> &[MountEntry] {
        &self.entries
    }

    /// Whether any entry's source equals `source` exactly
    pub fn contains_source(&self, source: &str) -> bool {
        self.entries.iter().any(|e| e.source == source)
    }
}

/// Assert that `mount` output lists `source` as a mounted source
pub fn mounted(result: &CommandResult, source: &str) -> Result<()> {
    if MountTable::parse(result.output()).contains_source(source) {
        Ok(())
    } else {
        Err(Error::assertion(
            format!("mount table to list source {source:?}"),
            result.output(),
        ))
    }
}

/// Assert that `mount` output does not list `source` as a mounted source
pub fn not_mounted(result: &CommandResult, source: &str) -> Result<()> {
    if MountTable::parse(result.output()).contains_source(source) {
        Err(Error::assertion(
            format!("mount table to not list source {source:?}"),
            result.output(),
        ))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(output: &str) -> CommandResult {
        // Only the output text matters for matchers.
        CommandResult::new(Some(0), output.to_string())
    }

    #[test]
    fn test_contains_literal_substring() {
        let out = result("total 0\ndrwx------ lost+found\n");
        assert!(contains(&out, "lost+found").is_ok());
        assert!(contains(&out, "testfile").is_err());
    }

    #[test]
    fn test_contains_is_not_a_pattern_match() {
        // '+' must be treated literally, not as a regex quantifier.
        let out = result("lostfound\n");
        assert!(contains(&out, "lost+found").is_err());
    }

    #[test]
    fn test_does_not_contain() {
        let out = result("rbd0 other-image - /dev/rbd0\n");
        assert!(does_not_contain(&out, "docker-test-volume").is_ok());
        assert!(does_not_contain(&out, "other-image").is_err());
    }

    #[test]
    fn test_contains_size_exact_and_binary_suffix() {
        assert!(contains_size(&result("/bar 976M\n"), "976M").is_ok());
        assert!(contains_size(&result("/bar 976Mi\n"), "976M").is_ok());
        assert!(contains_size(&result("/bar 2.0G\n"), "976M").is_err());
        // No substring matching inside larger tokens.
        assert!(contains_size(&result("/bar 1976M\n"), "976M").is_err());
    }

    #[test]
    fn test_expect_failure() {
        let denied = CommandResult::new(Some(32), "access denied".to_string());
        assert!(expect_failure(&denied).is_ok());
        let ok = CommandResult::new(Some(0), String::new());
        assert!(expect_failure(&ok).is_err());
    }

    #[test]
    fn test_mount_table_parses_standard_lines() {
        let table = MountTable::parse(
            "proc on /proc type proc (rw,nosuid)\n\
             10.1.1.233:///data on /foo type nfs (rw)\n",
        );
        assert_eq!(table.entries().len(), 2);
        assert_eq!(table.entries()[1].source, "10.1.1.233:///data");
        assert_eq!(table.entries()[1].target, "/foo");
        assert_eq!(table.entries()[1].fstype.as_deref(), Some("nfs"));
    }

    #[test]
    fn test_mount_table_tolerates_extra_whitespace() {
        let table = MountTable::parse("  /dev/rbd0   on   /mnt/vol   type ext4 (rw)  \n");
        assert!(table.contains_source("/dev/rbd0"));
    }

    #[test]
    fn test_mount_source_prefix_boundary() {
        let out = result(
            "10.1.1.233:///data2 on /bar type nfs (rw)\n\
             something else entirely\n",
        );
        // /data was unmounted; the remaining /data2 line must not be
        // mistaken for it.
        assert!(not_mounted(&out, "10.1.1.233:///data").is_ok());
        assert!(mounted(&out, "10.1.1.233:///data2").is_ok());
        assert!(mounted(&out, "10.1.1.233:///data").is_err());
    }
}
