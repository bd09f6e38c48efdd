//! View models built from resolved portals
//!
//! Link handling lives here rather than in access resolution: whether a
//! portal opens in a new tab says nothing about who may see it.

use serde::Serialize;

use crate::access::GroupedResources;
use crate::auth::Session;
use crate::catalog::ResourceDescriptor;

pub const BADGE_ADVANCED_SETTINGS: &str = "⚙️ Advanced Settings";
pub const BADGE_EXTERNAL: &str = "🔗 External Portal";

/// Role vocabulary shown on the admin page
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RoleInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const AVAILABLE_ROLES: [RoleInfo; 8] = [
    RoleInfo { id: "admin", name: "Admin", description: "Full system access" },
    RoleInfo { id: "manager", name: "Manager", description: "Analytics & operations" },
    RoleInfo { id: "photographer", name: "Photographer", description: "Photo uploads" },
    RoleInfo { id: "videographer", name: "Videographer", description: "Video uploads" },
    RoleInfo { id: "editor", name: "Editor", description: "Post-production" },
    RoleInfo { id: "post-production", name: "Post Production", description: "Editing workflows" },
    RoleInfo { id: "analyst", name: "Analyst", description: "Analytics only" },
    RoleInfo { id: "vendor-coordinator", name: "Vendor Coordinator", description: "Vendor management" },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderView {
    pub display_name: String,
    pub roles: String,
}

impl HeaderView {
    pub fn from_session(session: &Session) -> Self {
        Self {
            display_name: session.profile.display_name().to_string(),
            roles: session.display_roles(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalCardView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub url: String,
    pub opens_new_context: bool,
    pub badge: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionView {
    pub category: &'static str,
    pub title: &'static str,
    pub portals: Vec<PortalCardView>,
}

/// Host and path of an absolute http(s) URL
fn http_location(raw: &str) -> Option<(String, String)> {
    let parsed = url::Url::parse(raw).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some((host, parsed.path().to_string()))
}

impl PortalCardView {
    pub fn new(portal: &ResourceDescriptor, admin_console_url: &str) -> Self {
        let location = http_location(&portal.url);
        let opens_new_context = location.is_some();

        let badge = match (&location, http_location(admin_console_url)) {
            (Some((host, path)), Some((console_host, console_path)))
                if *host == console_host && path.starts_with(console_path.as_str()) =>
            {
                Some(BADGE_ADVANCED_SETTINGS)
            }
            (Some(_), _) => Some(BADGE_EXTERNAL),
            (None, _) => None,
        };

        Self {
            id: portal.id.clone(),
            name: portal.name.clone(),
            description: portal.description.clone(),
            icon: portal.icon.clone(),
            url: portal.url.clone(),
            opens_new_context,
            badge,
        }
    }
}

/// One section per group, in group order
pub fn build_sections(grouped: &GroupedResources<'_>, admin_console_url: &str) -> Vec<SectionView> {
    grouped
        .iter()
        .map(|group| SectionView {
            category: group.category.key(),
            title: group.category.display_name(),
            portals: group
                .resources
                .iter()
                .map(|portal| PortalCardView::new(portal, admin_console_url))
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{accessible_resources, group_by_category};
    use crate::catalog::{Catalog, Category, RoleSet};

    const CONSOLE: &str = "https://login.candidstudios.net/admin/master/console/#/CandidStudios";

    fn portal(url: &str) -> ResourceDescriptor {
        ResourceDescriptor {
            id: "p".to_string(),
            name: "P".to_string(),
            description: String::new(),
            url: url.to_string(),
            icon: String::new(),
            required_roles: RoleSet::empty(),
            category: Category::Operations,
        }
    }

    #[test]
    fn test_relative_link_stays_in_tab() {
        let card = PortalCardView::new(&portal("/admin"), CONSOLE);
        assert!(!card.opens_new_context);
        assert_eq!(card.badge, None);
    }

    #[test]
    fn test_absolute_link_opens_new_context() {
        let card = PortalCardView::new(&portal("https://media.candidstudios.net"), CONSOLE);
        assert!(card.opens_new_context);
        assert_eq!(card.badge, Some(BADGE_EXTERNAL));
    }

    #[test]
    fn test_console_link_gets_settings_badge() {
        let card = PortalCardView::new(&portal(CONSOLE), CONSOLE);
        assert_eq!(card.badge, Some(BADGE_ADVANCED_SETTINGS));
    }

    #[test]
    fn test_non_http_scheme_is_not_external() {
        let card = PortalCardView::new(&portal("mailto:support@candidstudios.net"), CONSOLE);
        assert!(!card.opens_new_context);
    }

    #[test]
    fn test_sections_follow_group_order() {
        let catalog = Catalog::builtin().unwrap();
        let roles: RoleSet = ["admin"].into_iter().collect();
        let visible = accessible_resources(&roles, &catalog.portals);
        let sections = build_sections(&group_by_category(visible), CONSOLE);

        let titles: Vec<&str> = sections.iter().map(|s| s.title).collect();
        assert_eq!(
            titles,
            vec![
                "Analytics & Reporting",
                "Operations & Management",
                "Client Services",
                "Administration"
            ]
        );
        let admin = sections.last().unwrap();
        assert_eq!(admin.portals[0].id, "user-management");
        assert_eq!(admin.portals[1].badge, Some(BADGE_ADVANCED_SETTINGS));
    }

    #[test]
    fn test_sections_for_unprivileged_user() {
        let catalog = Catalog::builtin().unwrap();
        let visible = accessible_resources(&RoleSet::empty(), &catalog.portals);
        let sections = build_sections(&group_by_category(visible), CONSOLE);

        let keys: Vec<&str> = sections.iter().map(|s| s.category).collect();
        assert_eq!(keys, vec!["operations", "client"]);
        assert_eq!(sections[0].portals[0].id, "referral");
    }
}
