//! Account roles and the screen areas they unlock.
//!
//! Roles come from the API's login response and are cached client-side.
//! Nothing here is a security boundary: the API enforces authorization, this
//! only decides which menus and dashboards are offered.

use serde::{Deserialize, Serialize};

/// Account role as reported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular shopper.
    #[default]
    User,
    /// Full product and user management.
    Admin,
    /// Manager dashboard: user and product management.
    Manager,
}

/// A top-level area of the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Area {
    /// Public browsing, cart, wishlist and profile.
    Storefront,
    /// Admin dashboard.
    AdminDashboard,
    /// Manager dashboard.
    ManagerDashboard,
}

impl Role {
    /// Where a freshly logged-in user of this role lands.
    #[must_use]
    pub const fn home_area(self) -> Area {
        match self {
            Self::User => Area::Storefront,
            Self::Admin => Area::AdminDashboard,
            Self::Manager => Area::ManagerDashboard,
        }
    }

    /// Whether menus for `area` should be rendered for this role.
    #[must_use]
    pub const fn can_access(self, area: Area) -> bool {
        matches!(
            (self, area),
            (_, Area::Storefront)
                | (Self::Admin, Area::AdminDashboard)
                | (Self::Manager, Area::ManagerDashboard)
        )
    }

    /// Whether this role may use the product and user management screens.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Admin | Self::Manager)
    }

    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::Manager => "manager",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

impl Area {
    /// Route path of the area's landing page.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Storefront => "/",
            Self::AdminDashboard => "/dashboard",
            Self::ManagerDashboard => "/manger_dashboard",
        }
    }
}
