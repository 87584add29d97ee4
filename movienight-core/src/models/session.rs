use nanoid::nanoid;
use serde::{Deserialize, Serialize};

pub use movienight_proto::Tier;

/// Identity of one transport connection (12-character nanoid)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    #[must_use]
    pub fn new() -> Self {
        Self(nanoid!(12))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read-only snapshot of a live session
///
/// Command handlers receive this instead of the session itself, so nothing
/// they hold keeps the registry locked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub id: ConnectionId,
    pub name: String,
    pub host: String,
    pub tier: Tier,
    pub color: String,
    pub name_forced: bool,
    pub color_forced: bool,
}

impl SessionInfo {
    #[must_use]
    pub fn is_mod(&self) -> bool {
        self.tier >= Tier::Mod
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.tier == Tier::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_unique() {
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        assert_eq!(a.as_str().len(), 12);
        assert_ne!(a, b);
    }
}
