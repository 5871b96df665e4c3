//! Host platform identity and filename escaping.

/// The `(os_name, os_version, arch)` triple identifying an install target.
///
/// Binary archives are built per platform, so the fingerprint is part of
/// every archive filename. Fields are fixed at construction time; there are
/// no setters.
///
/// # Example
///
/// ```
/// use pginstall_schema::PlatformFingerprint;
///
/// let platform = PlatformFingerprint::new("Linux", "Ubuntu 22.04", "x86_64");
/// assert_eq!(platform.os_version(), "Ubuntu 22.04");
/// assert_eq!(platform.to_string(), "Linux / Ubuntu 22.04 / x86_64");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PlatformFingerprint {
    os_name: String,
    os_version: String,
    arch: String,
}

impl PlatformFingerprint {
    /// Create a fingerprint from its three raw (unescaped) fields.
    pub fn new(
        os_name: impl Into<String>,
        os_version: impl Into<String>,
        arch: impl Into<String>,
    ) -> Self {
        Self {
            os_name: os_name.into(),
            os_version: os_version.into(),
            arch: arch.into(),
        }
    }

    /// Kernel name as `uname` reports it (e.g. `Linux`, `Darwin`).
    pub fn os_name(&self) -> &str {
        &self.os_name
    }

    /// Distribution or product name and release (e.g. `Ubuntu 22.04`).
    pub fn os_version(&self) -> &str {
        &self.os_version
    }

    /// Machine architecture (e.g. `x86_64`, `aarch64`).
    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// The three fields passed through [`escape_filename`], in filename order.
    pub fn escaped_fields(&self) -> [String; 3] {
        [
            escape_filename(&self.os_name),
            escape_filename(&self.os_version),
            escape_filename(&self.arch),
        ]
    }
}

impl std::fmt::Display for PlatformFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {} / {}", self.os_name, self.os_version, self.arch)
    }
}

/// Make a free-text platform field safe to embed in a filename.
///
/// Every space becomes an underscore; nothing else changes. The mapping is
/// one character to one character, so the output has the same length as the
/// input, and escaping twice is the same as escaping once.
///
/// ```
/// use pginstall_schema::escape_filename;
///
/// assert_eq!(escape_filename("Ubuntu 22.04"), "Ubuntu_22.04");
/// assert_eq!(escape_filename("Mac OS X"), "Mac_OS_X");
/// ```
pub fn escape_filename(s: &str) -> String {
    s.replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_escape_spaces() {
        assert_eq!(escape_filename("Ubuntu 22.04"), "Ubuntu_22.04");
        assert_eq!(escape_filename("  "), "__");
        assert_eq!(escape_filename(""), "");
    }

    #[test]
    fn test_escape_leaves_other_characters() {
        assert_eq!(escape_filename("x86_64"), "x86_64");
        assert_eq!(escape_filename("a\tb/c-d"), "a\tb/c-d");
    }

    #[test]
    fn test_escaped_fields_order() {
        let platform = PlatformFingerprint::new("Linux", "Debian GNU/Linux 12", "aarch64");
        assert_eq!(
            platform.escaped_fields(),
            [
                "Linux".to_string(),
                "Debian_GNU/Linux_12".to_string(),
                "aarch64".to_string()
            ]
        );
    }

    #[test]
    fn test_fingerprint_serde() {
        let platform = PlatformFingerprint::new("Darwin", "macOS 14.2", "arm64");
        let json = serde_json::to_string(&platform).unwrap();
        assert_eq!(
            json,
            r#"{"os_name":"Darwin","os_version":"macOS 14.2","arch":"arm64"}"#
        );
        let back: PlatformFingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, platform);
    }

    proptest! {
        #[test]
        fn escape_is_idempotent(s in ".*") {
            let once = escape_filename(&s);
            prop_assert_eq!(escape_filename(&once), once);
        }

        #[test]
        fn escape_preserves_length(s in ".*") {
            let escaped = escape_filename(&s);
            prop_assert_eq!(escaped.len(), s.len());
            prop_assert_eq!(escaped.chars().count(), s.chars().count());
        }

        #[test]
        fn escape_removes_every_space(s in ".*") {
            prop_assert!(!escape_filename(&s).contains(' '));
        }
    }
}
