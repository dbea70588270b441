// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{BTreeMap, BTreeSet};

use sqlx::{query, query_as};
use tracing::{debug, warn};

use crate::hierarchy::AncestorChain;
use crate::query::{RoleSourceQuery, RoleSourceRow};
use crate::sqlite::cbor::{decode_permissions, encode_cbor, encode_permissions};
use crate::sqlite::models::{ChainRow, MemberRoleRow};
use crate::sqlite::{SqliteError, SqliteStore, queries};
use crate::traits::{RoleStore, WriteRoleStore};
use crate::types::{
    GroupLink, MemberRole, MemberRoleError, MemberRoleId, Membership, NamespaceId, ProjectId,
    Resource, UserId,
};

impl RoleStore for SqliteStore {
    type Error = SqliteError;

    async fn ancestor_chains<R: Resource>(
        &self,
        resources: &[R],
    ) -> Result<BTreeMap<R, AncestorChain>, SqliteError> {
        if resources.is_empty() {
            return Ok(BTreeMap::new());
        }

        let ids: Vec<i64> = resources.iter().map(Resource::id).collect();
        let rows: Vec<ChainRow> = queries::ancestor_chains(R::KIND, &ids)
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;

        let mut chains = BTreeMap::new();
        for row in rows {
            let (resource_id, chain) = row.decode()?;
            chains.insert(R::from_id(resource_id), chain);
        }

        Ok(chains)
    }

    async fn namespaces_with_member_roles(
        &self,
        roots: &BTreeSet<NamespaceId>,
    ) -> Result<BTreeSet<NamespaceId>, SqliteError> {
        if roots.is_empty() {
            return Ok(BTreeSet::new());
        }

        let rows: Vec<(i64,)> = queries::namespaces_with_member_roles(roots.iter().copied())
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|(id,)| NamespaceId::new(id)).collect())
    }

    async fn role_sources<R: Resource>(
        &self,
        query: &RoleSourceQuery<R>,
    ) -> Result<Vec<RoleSourceRow<R>>, SqliteError> {
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<(i64, Vec<u8>)> = queries::role_sources(query)
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;

        debug!(
            kind = R::KIND.as_str(),
            resources = query.chains().len(),
            rows = rows.len(),
            "fetched role sources"
        );

        let mut result = Vec::with_capacity(rows.len());
        for (resource_id, permissions) in rows {
            let permissions = decode_permissions(&permissions)
                .map_err(|err| SqliteError::Decode("permissions".into(), err.into()))?;
            result.push(RoleSourceRow::new(R::from_id(resource_id), permissions));
        }

        Ok(result)
    }

    async fn admin_role(&self, user: &UserId) -> Result<Option<MemberRole>, SqliteError> {
        let row: Option<MemberRoleRow> = query_as(
            "
            SELECT
                member_roles_v1.id,
                member_roles_v1.namespace_id,
                member_roles_v1.name,
                member_roles_v1.base_access_level,
                member_roles_v1.permissions
            FROM
                user_admin_roles_v1
                JOIN member_roles_v1
                    ON member_roles_v1.id = user_admin_roles_v1.member_role_id
            WHERE
                user_admin_roles_v1.user_id = ?
            ",
        )
        .bind(user.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let role = MemberRole::try_from(row)?;
        if !role.is_admin() {
            warn!(
                user_id = %user,
                member_role_id = %role.id,
                "assigned admin role has a base access level"
            );
        }

        Ok(Some(role))
    }
}

impl WriteRoleStore for SqliteStore {
    type Error = SqliteError;

    async fn insert_namespace(
        &self,
        id: NamespaceId,
        parent: Option<NamespaceId>,
    ) -> Result<(), SqliteError> {
        let mut traversal_ids = match parent {
            Some(parent_id) => {
                let row: Option<ChainRow> = query_as(
                    "
                    SELECT
                        id AS resource_id,
                        traversal_ids
                    FROM
                        namespaces_v1
                    WHERE
                        id = ?
                    ",
                )
                .bind(parent_id.as_i64())
                .fetch_optional(&self.pool)
                .await?;

                let (_, chain) = row.ok_or(SqliteError::UnknownParent(parent_id))?.decode()?;
                chain.ids().to_vec()
            }
            None => Vec::new(),
        };
        traversal_ids.push(id);

        let root_id = traversal_ids.first().copied().unwrap_or(id);
        let encoded = encode_cbor(&traversal_ids)
            .map_err(|err| SqliteError::Encode("traversal_ids".into(), err))?;

        query(
            "
            INSERT OR REPLACE
            INTO
                namespaces_v1 (
                    id,
                    parent_id,
                    root_id,
                    traversal_ids
                )
            VALUES
                (?, ?, ?, ?)
            ",
        )
        .bind(id.as_i64())
        .bind(parent.map(|parent| parent.as_i64()))
        .bind(root_id.as_i64())
        .bind(encoded)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_project(
        &self,
        id: ProjectId,
        namespace: NamespaceId,
    ) -> Result<(), SqliteError> {
        let exists = query("SELECT 1 FROM namespaces_v1 WHERE id = ?")
            .bind(namespace.as_i64())
            .fetch_optional(&self.pool)
            .await?
            .is_some();

        if !exists {
            return Err(SqliteError::UnknownNamespace(namespace));
        }

        query(
            "
            INSERT OR REPLACE
            INTO
                projects_v1 (
                    id,
                    namespace_id
                )
            VALUES
                (?, ?)
            ",
        )
        .bind(id.as_i64())
        .bind(namespace.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_member_role(&self, role: MemberRole) -> Result<(), SqliteError> {
        role.validate()?;

        if let Some(namespace_id) = role.namespace_id {
            let row: Option<(Option<i64>,)> =
                query_as("SELECT parent_id FROM namespaces_v1 WHERE id = ?")
                    .bind(namespace_id.as_i64())
                    .fetch_optional(&self.pool)
                    .await?;

            match row {
                None => return Err(SqliteError::UnknownNamespace(namespace_id)),
                Some((Some(_),)) => return Err(MemberRoleError::NotTopLevel(namespace_id).into()),
                Some((None,)) => (),
            }
        }

        let name_taken = query(
            "
            SELECT
                1
            FROM
                member_roles_v1
            WHERE
                name = ?
                AND namespace_id IS ?
                AND id != ?
            ",
        )
        .bind(&role.name)
        .bind(role.namespace_id.map(|id| id.as_i64()))
        .bind(role.id.as_i64())
        .fetch_optional(&self.pool)
        .await?
        .is_some();

        if name_taken {
            return Err(MemberRoleError::DuplicateName(role.name).into());
        }

        let permissions = encode_permissions(&role.permissions)
            .map_err(|err| SqliteError::Encode("permissions".into(), err))?;

        query(
            "
            INSERT OR REPLACE
            INTO
                member_roles_v1 (
                    id,
                    namespace_id,
                    name,
                    base_access_level,
                    permissions
                )
            VALUES
                (?, ?, ?, ?, ?)
            ",
        )
        .bind(role.id.as_i64())
        .bind(role.namespace_id.map(|id| id.as_i64()))
        .bind(&role.name)
        .bind(role.base_access_level.map(i64::from))
        .bind(permissions)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_membership(&self, membership: Membership) -> Result<(), SqliteError> {
        query(
            "
            INSERT OR REPLACE
            INTO
                members_v1 (
                    user_id,
                    source_type,
                    source_id,
                    access_level,
                    member_role_id
                )
            VALUES
                (?, ?, ?, ?, ?)
            ",
        )
        .bind(membership.user_id.as_i64())
        .bind(membership.source.kind().as_str())
        .bind(membership.source.id())
        .bind(i64::from(membership.access_level))
        .bind(membership.member_role_id.map(|id| id.as_i64()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_group_link(&self, link: GroupLink) -> Result<(), SqliteError> {
        query(
            "
            INSERT OR REPLACE
            INTO
                group_links_v1 (
                    shared_group_id,
                    shared_with_group_id,
                    access_level,
                    member_role_id
                )
            VALUES
                (?, ?, ?, ?)
            ",
        )
        .bind(link.shared_group_id.as_i64())
        .bind(link.shared_with_group_id.as_i64())
        .bind(i64::from(link.access_level))
        .bind(link.member_role_id.map(|id| id.as_i64()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn assign_admin_role(
        &self,
        user: UserId,
        role: MemberRoleId,
    ) -> Result<(), SqliteError> {
        query(
            "
            INSERT OR REPLACE
            INTO
                user_admin_roles_v1 (
                    user_id,
                    member_role_id
                )
            VALUES
                (?, ?)
            ",
        )
        .bind(user.as_i64())
        .bind(role.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
