// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashMap;

use crate::permission::PermissionSet;
use crate::query::RoleSourceRow;
use crate::types::Resource;

/// Folds role-source rows into one permission set per resource.
///
/// A permission is granted on a resource as soon as any of its rows switches it on, values of
/// `false` never take away what another row granted. Granted permissions are kept if they are
/// part of `enabled`. Every requested resource is present in the result, rows for other
/// resources are ignored.
pub fn aggregate<R: Resource>(
    resources: &[R],
    rows: Vec<RoleSourceRow<R>>,
    enabled: &PermissionSet,
) -> HashMap<R, PermissionSet> {
    let mut granted: HashMap<R, PermissionSet> = resources
        .iter()
        .map(|resource| (*resource, PermissionSet::new()))
        .collect();

    for row in rows {
        let Some(permissions) = granted.get_mut(&row.resource) else {
            continue;
        };

        permissions.extend(
            row.permissions
                .into_iter()
                .filter(|(permission, value)| *value && enabled.contains(permission))
                .map(|(permission, _)| permission),
        );
    }

    granted
}
