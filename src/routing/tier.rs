//! Privilege tier selection.
//!
//! # Precedence
//! ```text
//! claim == "admin" && admin tier declares a template or controllers → Admin
//! claim != ""      && claim listed in authorized.privilege          → Authorized
//! otherwise                                                         → General
//! ```
//! The general tier is returned even when it is entirely empty.

use std::fmt;

use crate::config::RouteConfig;
use crate::session::SessionClaim;

/// Privilege that unlocks the admin tier.
pub const ADMIN_PRIVILEGE: &str = "admin";

/// One of the three configuration variants of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    General,
    Authorized,
    Admin,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::General => "general",
            Tier::Authorized => "authorized",
            Tier::Admin => "admin",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three tiers of a route, in the shape the resolver reads them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tiers {
    pub general: RouteConfig,
    pub admin: RouteConfig,
    pub authorized: RouteConfig,
}

impl Tiers {
    pub fn get(&self, tier: Tier) -> &RouteConfig {
        match tier {
            Tier::General => &self.general,
            Tier::Authorized => &self.authorized,
            Tier::Admin => &self.admin,
        }
    }
}

/// Select the tier that applies to `claim`.
///
/// The authorized whitelist is matched by exact entry, not by substring:
/// a claim of `use` is not admitted by a whitelist of `user`.
pub fn resolve_tier(tiers: &Tiers, claim: &SessionClaim) -> Tier {
    let privilege = claim.privilege.as_str();

    if privilege == ADMIN_PRIVILEGE && !tiers.admin.is_empty() {
        return Tier::Admin;
    }

    if !privilege.is_empty() && whitelist_contains(&tiers.authorized.privilege, privilege) {
        return Tier::Authorized;
    }

    Tier::General
}

/// Exact membership in a comma-separated privilege list.
fn whitelist_contains(whitelist: &str, privilege: &str) -> bool {
    whitelist
        .split(',')
        .map(str::trim)
        .any(|entry| !entry.is_empty() && entry == privilege)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(template: &str) -> RouteConfig {
        RouteConfig {
            template: template.into(),
            ..Default::default()
        }
    }

    fn tiers() -> Tiers {
        Tiers {
            general: config("public"),
            admin: config("admin-view"),
            authorized: RouteConfig {
                privilege: "user, editor".into(),
                ..config("member-view")
            },
        }
    }

    fn claim(privilege: &str) -> SessionClaim {
        SessionClaim::new("alice", privilege)
    }

    #[test]
    fn test_admin_wins() {
        assert_eq!(resolve_tier(&tiers(), &claim("admin")), Tier::Admin);
    }

    #[test]
    fn test_admin_needs_populated_tier() {
        let mut t = tiers();
        t.admin = RouteConfig {
            table: "only-a-table".into(),
            ..Default::default()
        };
        // Admin is not in the authorized whitelist either.
        assert_eq!(resolve_tier(&t, &claim("admin")), Tier::General);

        t.authorized.privilege = "admin".into();
        assert_eq!(resolve_tier(&t, &claim("admin")), Tier::Authorized);
    }

    #[test]
    fn test_admin_controllers_only() {
        let mut t = tiers();
        t.admin = RouteConfig {
            controllers: "panel".into(),
            ..Default::default()
        };
        assert_eq!(resolve_tier(&t, &claim("admin")), Tier::Admin);
    }

    #[test]
    fn test_authorized_whitelist() {
        assert_eq!(resolve_tier(&tiers(), &claim("user")), Tier::Authorized);
        assert_eq!(resolve_tier(&tiers(), &claim("editor")), Tier::Authorized);
    }

    #[test]
    fn test_unlisted_and_anonymous_fall_through() {
        assert_eq!(resolve_tier(&tiers(), &claim("guest")), Tier::General);
        assert_eq!(resolve_tier(&tiers(), &claim("use")), Tier::General);
        assert_eq!(resolve_tier(&tiers(), &SessionClaim::anonymous()), Tier::General);
    }

    #[test]
    fn test_empty_whitelist_never_authorizes() {
        let mut t = tiers();
        t.authorized.privilege.clear();
        assert_eq!(resolve_tier(&t, &claim("user")), Tier::General);
    }

    #[test]
    fn test_empty_general_still_selected() {
        let t = Tiers::default();
        assert_eq!(resolve_tier(&t, &claim("admin")), Tier::General);
        assert!(t.get(Tier::General).is_empty());
    }
}
