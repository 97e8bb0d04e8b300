use std::fmt;
use uuid::Uuid;

/// Directory name used for the staging area of the unscoped workspace.
pub const SHARED_SCOPE: &str = "shared";

/// Which workspace a request operates on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Single workspace shared by every client.
    Global,
    /// Workspace owned by one browser session.
    Session(Uuid),
}

impl Scope {
    pub fn new_session() -> Self {
        Scope::Session(Uuid::new_v4())
    }

    /// Parses a session token. Only well-formed UUIDs are accepted so a
    /// cookie value can never name an arbitrary directory.
    pub fn parse_session(token: &str) -> Option<Self> {
        Uuid::parse_str(token.trim()).ok().map(Scope::Session)
    }

    /// Directory name of this scope under a workspace root.
    pub fn dir_name(&self) -> String {
        match self {
            Scope::Global => SHARED_SCOPE.to_string(),
            Scope::Session(id) => id.to_string(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => write!(f, "global"),
            Scope::Session(id) => write!(f, "session {}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_session_accepts_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(
            Scope::parse_session(&id.to_string()),
            Some(Scope::Session(id))
        );
    }

    #[test]
    fn test_parse_session_rejects_paths() {
        assert_eq!(Scope::parse_session("../etc"), None);
        assert_eq!(Scope::parse_session(""), None);
        assert_eq!(Scope::parse_session(SHARED_SCOPE), None);
    }

    #[test]
    fn test_dir_names() {
        assert_eq!(Scope::Global.dir_name(), "shared");
        let id = Uuid::new_v4();
        assert_eq!(Scope::Session(id).dir_name(), id.to_string());
    }
}
