//! Access resolution: which portals a role set may see, and how they group
//!
//! Everything here is pure and allocation-only. There is no superuser
//! shortcut; a portal is visible to a role only if it lists that role (or
//! lists none at all).

use crate::catalog::{Category, ResourceDescriptor, RoleSet};

/// Check whether `roles` satisfies a portal's `required` roles
///
/// An empty requirement means every authenticated user. Otherwise one
/// matching role is enough.
pub fn can_access(required: &RoleSet, roles: &RoleSet) -> bool {
    required.is_empty() || required.intersects(roles)
}

/// Filter resources down to those `roles` may see, preserving input order
///
/// Accepts the catalog slice or an already filtered list. An empty result is
/// a valid "no access" outcome.
pub fn accessible_resources<'a, I>(roles: &RoleSet, resources: I) -> Vec<&'a ResourceDescriptor>
where
    I: IntoIterator<Item = &'a ResourceDescriptor>,
{
    resources
        .into_iter()
        .filter(|r| can_access(&r.required_roles, roles))
        .collect()
}

/// Resources of one category, in input order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryGroup<'a> {
    pub category: Category,
    pub resources: Vec<&'a ResourceDescriptor>,
}

/// Ordered mapping from category to resources
///
/// Keys follow first-occurrence order in the grouped input, not the
/// declaration order of [`Category`]. Empty groups never exist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupedResources<'a> {
    groups: Vec<CategoryGroup<'a>>,
}

impl<'a> GroupedResources<'a> {
    pub fn iter(&self) -> impl Iterator<Item = &CategoryGroup<'a>> {
        self.groups.iter()
    }

    pub fn get(&self, category: Category) -> Option<&[&'a ResourceDescriptor]> {
        self.groups
            .iter()
            .find(|g| g.category == category)
            .map(|g| g.resources.as_slice())
    }

    pub fn categories(&self) -> Vec<Category> {
        self.groups.iter().map(|g| g.category).collect()
    }

    /// Number of groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of resources across all groups
    pub fn total_resources(&self) -> usize {
        self.groups.iter().map(|g| g.resources.len()).sum()
    }
}

/// Stable grouping by category
pub fn group_by_category<'a, I>(resources: I) -> GroupedResources<'a>
where
    I: IntoIterator<Item = &'a ResourceDescriptor>,
{
    let mut groups: Vec<CategoryGroup<'a>> = Vec::new();

    for resource in resources {
        // At most four groups, a linear scan is fine
        match groups.iter_mut().find(|g| g.category == resource.category) {
            Some(group) => group.resources.push(resource),
            None => groups.push(CategoryGroup {
                category: resource.category,
                resources: vec![resource],
            }),
        }
    }

    GroupedResources { groups }
}
