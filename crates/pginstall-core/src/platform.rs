//! Host platform detection.
//!
//! The fingerprint is read from the host once and cached for the life of the
//! process: host identity does not change while we run.

use std::sync::OnceLock;

use pginstall_schema::PlatformFingerprint;
use thiserror::Error;

static CURRENT: OnceLock<PlatformFingerprint> = OnceLock::new();

#[cfg(target_os = "linux")]
const OS_RELEASE_FILES: [&str; 2] = ["/etc/os-release", "/usr/lib/os-release"];

/// The operating system identity could not be determined.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// No source of OS release information was usable.
    #[error("Could not determine operating system identity: {0}")]
    Detection(String),
}

/// The fingerprint of the running host.
///
/// Detected on first call, then served from a process-wide cache.
///
/// # Errors
///
/// Returns [`PlatformError::Detection`] if the OS release cannot be read.
/// Callers should treat this as fatal.
pub fn current_platform() -> Result<PlatformFingerprint, PlatformError> {
    if let Some(platform) = CURRENT.get() {
        return Ok(platform.clone());
    }
    let detected = detect()?;
    tracing::debug!("Detected platform {detected}");
    Ok(CURRENT.get_or_init(|| detected).clone())
}

/// Read the fingerprint from the host, bypassing the cache.
///
/// # Errors
///
/// Returns [`PlatformError::Detection`] if the OS release cannot be read or
/// a field would not fit in a single file name.
pub fn detect() -> Result<PlatformFingerprint, PlatformError> {
    let platform = PlatformFingerprint::new(os_name(), os_version()?, std::env::consts::ARCH);
    check_fingerprint(&platform)?;
    Ok(platform)
}

/// Kernel name in `uname -s` spelling.
fn os_name() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "Darwin",
        "freebsd" => "FreeBSD",
        "openbsd" => "OpenBSD",
        "netbsd" => "NetBSD",
        "windows" => "Windows",
        other => other,
    }
}

#[cfg(target_os = "linux")]
fn os_version() -> Result<String, PlatformError> {
    for path in OS_RELEASE_FILES {
        let Ok(contents) = std::fs::read_to_string(path) else {
            continue;
        };
        if let Some(release) = parse_os_release(&contents) {
            return Ok(release);
        }
    }
    Err(PlatformError::Detection(format!(
        "none of {} is readable",
        OS_RELEASE_FILES.join(", ")
    )))
}

#[cfg(target_os = "macos")]
fn os_version() -> Result<String, PlatformError> {
    let name = sw_vers("-productName")?;
    let version = sw_vers("-productVersion")?;
    Ok(format!("{name} {version}"))
}

#[cfg(target_os = "macos")]
fn sw_vers(flag: &str) -> Result<String, PlatformError> {
    let output = std::process::Command::new("sw_vers")
        .arg(flag)
        .output()
        .map_err(|e| PlatformError::Detection(format!("failed to run sw_vers: {e}")))?;
    if !output.status.success() {
        return Err(PlatformError::Detection(format!(
            "sw_vers {flag} exited with {}",
            output.status
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn os_version() -> Result<String, PlatformError> {
    Err(PlatformError::Detection(format!(
        "no release information source for {}",
        std::env::consts::OS
    )))
}

/// Build `NAME VERSION_ID` from the contents of an `os-release` file.
///
/// `ID` stands in for `NAME` when the name is missing or contains a path
/// separator (`Debian GNU/Linux`). Rolling distributions ship no
/// `VERSION_ID`; the name alone is used then.
///
/// ```
/// use pginstall_core::platform::parse_os_release;
///
/// let contents = "NAME=\"Ubuntu\"\nVERSION_ID=\"22.04\"\nID=ubuntu\n";
/// assert_eq!(parse_os_release(contents).as_deref(), Some("Ubuntu 22.04"));
///
/// let contents = "NAME=\"Debian GNU/Linux\"\nVERSION_ID=\"12\"\nID=debian\n";
/// assert_eq!(parse_os_release(contents).as_deref(), Some("debian 12"));
/// ```
pub fn parse_os_release(contents: &str) -> Option<String> {
    let mut name = None;
    let mut id = None;
    let mut version = None;

    for line in contents.lines() {
        let line = line.trim();
        if line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
        if value.is_empty() || !is_path_safe(value) {
            continue;
        }
        match key.trim() {
            "NAME" => name = Some(value.to_string()),
            "ID" => id = Some(value.to_string()),
            "VERSION_ID" => version = Some(value.to_string()),
            _ => {}
        }
    }

    let name = name.or(id)?;
    Some(match version {
        Some(version) => format!("{name} {version}"),
        None => name,
    })
}

/// A fingerprint field must stay a single path component once escaped.
fn is_path_safe(field: &str) -> bool {
    !field.contains(['/', '\\'])
}

/// Refuse a fingerprint that cannot name an archive file.
///
/// # Errors
///
/// Returns [`PlatformError::Detection`] if a field is empty or contains a
/// path separator.
pub fn check_fingerprint(platform: &PlatformFingerprint) -> Result<(), PlatformError> {
    let fields = [platform.os_name(), platform.os_version(), platform.arch()];
    match fields.iter().find(|field| field.is_empty() || !is_path_safe(field)) {
        Some(field) => Err(PlatformError::Detection(format!(
            "unusable fingerprint field \"{field}\""
        ))),
        None => Ok(()),
    }
}
