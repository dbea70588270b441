// SPDX-License-Identifier: MIT OR Apache-2.0

use sqlx::FromRow;

use crate::access::AccessLevel;
use crate::hierarchy::AncestorChain;
use crate::sqlite::cbor::{decode_cbor, decode_permissions};
use crate::sqlite::{DecodeError, SqliteError};
use crate::types::{MemberRole, MemberRoleId, NamespaceId};

/// A resource id joined with the traversal ids of its closest namespace.
#[derive(FromRow, Debug, Clone, PartialEq, Eq)]
pub struct ChainRow {
    pub resource_id: i64,
    pub traversal_ids: Vec<u8>,
}

impl ChainRow {
    pub fn decode(self) -> Result<(i64, AncestorChain), SqliteError> {
        let ids: Vec<NamespaceId> = decode_cbor(&self.traversal_ids[..])
            .map_err(|err| SqliteError::Decode("traversal_ids".into(), err.into()))?;
        let chain = AncestorChain::new(ids)
            .ok_or_else(|| SqliteError::Decode("traversal_ids".into(), DecodeError::EmptyChain))?;
        Ok((self.resource_id, chain))
    }
}

/// A single member role row as it is inserted in the database.
#[derive(FromRow, Debug, Clone, PartialEq, Eq)]
pub struct MemberRoleRow {
    pub id: i64,
    pub namespace_id: Option<i64>,
    pub name: String,
    pub base_access_level: Option<i64>,
    pub permissions: Vec<u8>,
}

impl TryFrom<MemberRoleRow> for MemberRole {
    type Error = SqliteError;

    fn try_from(row: MemberRoleRow) -> Result<Self, Self::Error> {
        let base_access_level = row
            .base_access_level
            .map(AccessLevel::try_from)
            .transpose()
            .map_err(|err| SqliteError::Decode("base_access_level".into(), err.into()))?;

        let permissions = decode_permissions(&row.permissions)
            .map_err(|err| SqliteError::Decode("permissions".into(), err.into()))?;

        Ok(MemberRole {
            id: MemberRoleId::new(row.id),
            name: row.name,
            namespace_id: row.namespace_id.map(NamespaceId::new),
            base_access_level,
            permissions,
        })
    }
}
