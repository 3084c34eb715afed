use std::fmt;
use std::net::IpAddr;

/// Identity whose attempts are counted
///
/// Authenticated requests count against the user id, anonymous ones against
/// the client IP.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Actor {
    User(String),
    Ip(IpAddr),
}

impl Actor {
    pub fn user(id: impl Into<String>) -> Self {
        Self::User(id.into())
    }

    pub fn ip(addr: IpAddr) -> Self {
        Self::Ip(addr)
    }

    /// Prefer the authenticated user, fall back to the client address
    pub fn resolve(user_id: Option<&str>, ip: IpAddr) -> Self {
        match user_id.map(str::trim) {
            Some(id) if !id.is_empty() => Self::User(id.to_string()),
            _ => Self::Ip(ip),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        match self {
            Self::User(id) => id.trim().is_empty(),
            Self::Ip(_) => false,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => f.write_str(id),
            Self::Ip(addr) => write!(f, "{}", addr),
        }
    }
}

impl From<IpAddr> for Actor {
    fn from(addr: IpAddr) -> Self {
        Self::Ip(addr)
    }
}

impl From<&str> for Actor {
    fn from(id: &str) -> Self {
        Self::User(id.to_string())
    }
}

impl From<u64> for Actor {
    fn from(id: u64) -> Self {
        Self::User(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_prefers_user() {
        let ip: IpAddr = "203.0.113.7".parse().unwrap();
        assert_eq!(Actor::resolve(Some("42"), ip), Actor::user("42"));
        assert_eq!(Actor::resolve(None, ip), Actor::ip(ip));
        assert_eq!(Actor::resolve(Some("  "), ip), Actor::ip(ip));
    }

    #[test]
    fn test_display_is_raw_identifier() {
        assert_eq!(Actor::from(42u64).to_string(), "42");
        assert_eq!(Actor::from("user42").to_string(), "user42");
        let ip: IpAddr = "::1".parse().unwrap();
        assert_eq!(Actor::from(ip).to_string(), "::1");
    }

    #[test]
    fn test_empty_user() {
        assert!(Actor::user("").is_empty());
        assert!(!Actor::user("7").is_empty());
    }
}
