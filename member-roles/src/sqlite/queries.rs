// SPDX-License-Identifier: MIT OR Apache-2.0

//! Statements answering a whole batch in one round-trip.
//!
//! The role-source union runs over a `chains` table expression holding one
//! `(resource_id, namespace_id)` pair per namespace in each ancestor chain. Every sub-query
//! selects `(resource_id, permissions)` and binds the user id once.
//!
//! Id lists are bound as a single JSON array and expanded with `json_each`, the number of bound
//! variables stays the same no matter how large a batch is.
use serde_json::Value;
use sqlx::{QueryBuilder, Sqlite};

use crate::query::{RoleSourceQuery, SubQuery};
use crate::types::{NamespaceId, Resource, ResourceKind};

/// SQL of a sub-query, split around the bound user id.
fn sub_query_sql(sub_query: SubQuery) -> (&'static str, &'static str) {
    match sub_query {
        SubQuery::ProjectMembership => (
            "
            SELECT
                targets.resource_id,
                member_roles_v1.permissions
            FROM
                (SELECT DISTINCT resource_id FROM chains) AS targets
                JOIN members_v1
                    ON members_v1.source_type = 'project'
                    AND members_v1.source_id = targets.resource_id
                JOIN member_roles_v1
                    ON member_roles_v1.id = members_v1.member_role_id
            WHERE
                members_v1.user_id = ",
            "
            ",
        ),
        SubQuery::NamespaceMembership => (
            "
            SELECT
                chains.resource_id,
                member_roles_v1.permissions
            FROM
                chains
                JOIN members_v1
                    ON members_v1.source_type = 'namespace'
                    AND members_v1.source_id = chains.namespace_id
                JOIN member_roles_v1
                    ON member_roles_v1.id = members_v1.member_role_id
            WHERE
                members_v1.user_id = ",
            "
            ",
        ),
        SubQuery::GroupLinkOverride => (
            "
            SELECT
                chains.resource_id,
                override_roles.permissions
            FROM
                chains
                JOIN group_links_v1
                    ON group_links_v1.shared_group_id = chains.namespace_id
                JOIN members_v1
                    ON members_v1.source_type = 'namespace'
                    AND members_v1.source_id = group_links_v1.shared_with_group_id
                JOIN member_roles_v1 AS override_roles
                    ON override_roles.id = group_links_v1.member_role_id
            WHERE
                members_v1.user_id = ",
            "
                AND override_roles.base_access_level > members_v1.access_level
            ",
        ),
        SubQuery::GroupLinkSourceRole => (
            "
            SELECT
                chains.resource_id,
                member_roles_v1.permissions
            FROM
                chains
                JOIN group_links_v1
                    ON group_links_v1.shared_group_id = chains.namespace_id
                JOIN members_v1
                    ON members_v1.source_type = 'namespace'
                    AND members_v1.source_id = group_links_v1.shared_with_group_id
                JOIN member_roles_v1
                    ON member_roles_v1.id = members_v1.member_role_id
                LEFT JOIN member_roles_v1 AS override_roles
                    ON override_roles.id = group_links_v1.member_role_id
            WHERE
                members_v1.user_id = ",
            "
                AND (
                    (
                        group_links_v1.member_role_id IS NOT NULL
                        AND override_roles.base_access_level <= members_v1.access_level
                    )
                    OR (
                        group_links_v1.member_role_id IS NULL
                        AND members_v1.access_level <= group_links_v1.access_level
                    )
                )
            ",
        ),
    }
}

/// Role-source union of a non-empty query.
pub fn role_sources<'a, R: Resource>(query: &RoleSourceQuery<R>) -> QueryBuilder<'a, Sqlite> {
    let pairs: Vec<Value> = query
        .chains()
        .iter()
        .flat_map(|(resource, chain)| {
            chain
                .ids()
                .iter()
                .map(move |namespace| Value::from(vec![resource.id(), namespace.as_i64()]))
        })
        .collect();

    let mut builder = QueryBuilder::new(
        "
        WITH chains (resource_id, namespace_id) AS (
            SELECT
                json_extract(value, '$[0]'),
                json_extract(value, '$[1]')
            FROM
                json_each(",
    );
    builder.push_bind(Value::from(pairs).to_string());
    builder.push(
        ")
        )",
    );

    for (index, sub_query) in query.sub_queries().into_iter().enumerate() {
        if index > 0 {
            builder.push("UNION ALL");
        }

        let (head, tail) = sub_query_sql(sub_query);
        builder.push(head);
        builder.push_bind(query.user().as_i64());
        builder.push(tail);
    }

    builder
}

/// Resource ids with the traversal ids of their closest namespace.
pub fn ancestor_chains<'a>(kind: ResourceKind, ids: &[i64]) -> QueryBuilder<'a, Sqlite> {
    let mut builder = QueryBuilder::new(match kind {
        ResourceKind::Namespace => {
            "
            SELECT
                namespaces_v1.id AS resource_id,
                namespaces_v1.traversal_ids
            FROM
                namespaces_v1
            WHERE
                namespaces_v1.id IN "
        }
        ResourceKind::Project => {
            "
            SELECT
                projects_v1.id AS resource_id,
                namespaces_v1.traversal_ids
            FROM
                projects_v1
                JOIN namespaces_v1
                    ON namespaces_v1.id = projects_v1.namespace_id
            WHERE
                projects_v1.id IN "
        }
    });

    push_id_list(&mut builder, ids.iter().copied());
    builder
}

/// Root namespaces among the given ones which define member roles.
pub fn namespaces_with_member_roles<'a>(
    roots: impl IntoIterator<Item = NamespaceId>,
) -> QueryBuilder<'a, Sqlite> {
    let mut builder = QueryBuilder::new(
        "
        SELECT
            DISTINCT namespace_id
        FROM
            member_roles_v1
        WHERE
            namespace_id IN ",
    );

    push_id_list(&mut builder, roots.into_iter().map(|id| id.as_i64()));
    builder
}

/// Pushes a sub-select over all given ids, bound as one parameter.
fn push_id_list(builder: &mut QueryBuilder<'_, Sqlite>, ids: impl Iterator<Item = i64>) {
    let ids: Vec<Value> = ids.map(Value::from).collect();
    builder.push("(SELECT value FROM json_each(");
    builder.push_bind(Value::from(ids).to_string());
    builder.push("))");
}
