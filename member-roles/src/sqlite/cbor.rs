// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encoding of the blob columns in [CBOR] format.
//!
//! [CBOR]: https://cbor.io/
use std::collections::BTreeMap;
use std::io::Read;

use ciborium::de::Error as DeserializeError;
use ciborium::ser::Error as SerializeError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::permission::{Permission, PermissionMap};

/// Serializes a value into CBOR format.
pub fn encode_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>, EncodeError> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(value, &mut bytes).map_err(Into::<EncodeError>::into)?;
    Ok(bytes)
}

/// Deserializes a value which was formatted in CBOR.
pub fn decode_cbor<T: for<'a> Deserialize<'a>, R: Read>(reader: R) -> Result<T, DecodeError> {
    let value = ciborium::from_reader::<T, R>(reader).map_err(Into::<DecodeError>::into)?;
    Ok(value)
}

/// Encodes a permission map keyed by permission names.
pub fn encode_permissions(permissions: &PermissionMap) -> Result<Vec<u8>, EncodeError> {
    let named: BTreeMap<&str, bool> = permissions
        .iter()
        .map(|(permission, enabled)| (permission.name(), *enabled))
        .collect();
    encode_cbor(&named)
}

/// Decodes a permission map.
///
/// Names which are not part of the catalog (anymore) are skipped.
pub fn decode_permissions(bytes: &[u8]) -> Result<PermissionMap, DecodeError> {
    let named: BTreeMap<String, bool> = decode_cbor(bytes)?;

    let mut permissions = PermissionMap::new();
    for (name, enabled) in named {
        match name.parse::<Permission>() {
            Ok(permission) => {
                permissions.insert(permission, enabled);
            }
            Err(err) => warn!("skipping stored permission: {err}"),
        }
    }

    Ok(permissions)
}

/// An error occurred during CBOR serialization.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// An error occurred while writing bytes.
    #[error("an error occurred while writing bytes: {0}")]
    Io(std::io::Error),

    /// Contains a description of the problem delivered from serde.
    #[error("an error occurred while serializing value: {0}")]
    Value(String),
}

impl From<SerializeError<std::io::Error>> for EncodeError {
    fn from(value: SerializeError<std::io::Error>) -> Self {
        match value {
            SerializeError::Io(err) => EncodeError::Io(err),
            SerializeError::Value(err) => EncodeError::Value(err),
        }
    }
}

/// An error occurred during CBOR deserialization.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("an error occurred while reading bytes: {0}")]
    Io(std::io::Error),

    /// Contains the offset into the stream where the syntax error occurred.
    #[error("an error occurred while parsing bytes at position {0}")]
    Syntax(usize),

    #[error("an error occurred while processing a parsed value at position {0:?}: {1}")]
    Semantic(Option<usize>, String),

    #[error("recursion limit exceeded while decoding")]
    RecursionLimitExceeded,
}

impl From<DeserializeError<std::io::Error>> for DecodeError {
    fn from(value: DeserializeError<std::io::Error>) -> Self {
        match value {
            DeserializeError::Io(err) => DecodeError::Io(err),
            DeserializeError::Syntax(offset) => DecodeError::Syntax(offset),
            DeserializeError::Semantic(offset, description) => {
                DecodeError::Semantic(offset, description)
            }
            DeserializeError::RecursionLimitExceeded => DecodeError::RecursionLimitExceeded,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::permission::{Permission, PermissionMap};

    use super::{decode_permissions, encode_cbor, encode_permissions};

    #[test]
    fn unknown_permissions_are_skipped() {
        let bytes = encode_cbor(&BTreeMap::from([
            ("read_code", true),
            ("read_dependency", false),
            ("legacy_permission", true),
        ]))
        .unwrap();

        assert_eq!(
            decode_permissions(&bytes).unwrap(),
            PermissionMap::from([
                (Permission::ReadCode, true),
                (Permission::ReadDependency, false),
            ])
        );
    }

    #[test]
    fn permissions_are_stored_by_name() {
        let permissions = PermissionMap::from([(Permission::AdminWebHook, true)]);
        let bytes = encode_permissions(&permissions).unwrap();
        assert_eq!(bytes, encode_cbor(&BTreeMap::from([("admin_web_hook", true)])).unwrap());
    }
}
