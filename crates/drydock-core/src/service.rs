use std::fmt;
use std::path::{Path, PathBuf};

/// Longest accepted service name, in bytes.
pub const MAX_SERVICE_NAME_LEN: usize = 128;

/// Identifier of a deployment target.
///
/// Doubles as a single path component under the server's data directory, so
/// construction rejects anything that could leave that directory. There is no
/// sanitizing: a bad name is an error, never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceName(String);

impl ServiceName {
    pub fn parse(raw: &str) -> Result<Self, ServiceNameError> {
        if raw.is_empty() {
            return Err(ServiceNameError::Empty);
        }
        if raw.len() > MAX_SERVICE_NAME_LEN {
            return Err(ServiceNameError::TooLong { len: raw.len() });
        }
        if raw.contains(['/', '\\']) {
            return Err(ServiceNameError::PathSeparator(raw.to_owned()));
        }
        if raw.contains("..") || raw == "." {
            return Err(ServiceNameError::ParentReference(raw.to_owned()));
        }
        if raw.starts_with(['.', '-']) {
            return Err(ServiceNameError::LeadingCharacter(raw.to_owned()));
        }
        if raw.chars().any(char::is_control) {
            return Err(ServiceNameError::ControlCharacter(raw.to_owned()));
        }
        Ok(Self(raw.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<root>/<service>`
    pub fn dir_in(&self, root: &Path) -> PathBuf {
        root.join(&self.0)
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ServiceName {
    type Err = ServiceNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ServiceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceNameError {
    #[error("missing service name")]
    Empty,

    #[error("service name is {len} bytes, limit is {max}", max = MAX_SERVICE_NAME_LEN)]
    TooLong { len: usize },

    #[error("service name {0:?} contains a path separator")]
    PathSeparator(String),

    #[error("service name {0:?} contains a parent-directory reference")]
    ParentReference(String),

    #[error("service name {0:?} must not start with '.' or '-'")]
    LeadingCharacter(String),

    #[error("service name {0:?} contains a control character")]
    ControlCharacter(String),
}
