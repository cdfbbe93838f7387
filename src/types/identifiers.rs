use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Identifies a script for recursion detection: the path exactly as it was written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScriptId(String);

impl ScriptId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }

    /// Paths to try when opening the script: as written, then from the parent directory.
    #[must_use]
    pub fn candidate_paths(&self) -> Vec<PathBuf> {
        let direct = PathBuf::from(&self.0);
        if direct.is_absolute() {
            vec![direct]
        } else {
            vec![direct, Path::new("..").join(&self.0)]
        }
    }
}

impl fmt::Display for ScriptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Credentials attached to outgoing requests by the caller after a successful login.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// The acting principal, as shown by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    username: String,
    user_id: Option<i64>,
}

impl Identity {
    #[must_use]
    pub fn new(username: impl Into<String>, user_id: Option<i64>) -> Self {
        Self {
            username: username.into(),
            user_id,
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub const fn user_id(&self) -> Option<i64> {
        self.user_id
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.user_id {
            Some(id) => write!(f, "{} (#{id})", self.username),
            None => write!(f, "{}", self.username),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_script_ids_fall_back_to_parent_directory() {
        let id = ScriptId::new("scripts/a.txt");
        assert_eq!(
            id.candidate_paths(),
            vec![
                PathBuf::from("scripts/a.txt"),
                PathBuf::from("../scripts/a.txt")
            ]
        );
    }

    #[test]
    fn credentials_debug_masks_password() {
        let creds = Credentials::new("alice", "hunter2");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn identity_display_includes_user_id_when_known() {
        assert_eq!(Identity::new("bob", Some(7)).to_string(), "bob (#7)");
        assert_eq!(Identity::new("bob", None).to_string(), "bob");
    }
}
