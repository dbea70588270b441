// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;

use thiserror::Error;

/// Errors returned by the resolution engine.
///
/// Closed gates and unknown resources are never errors, they resolve to empty permission sets.
/// Callers should treat any error as "no custom permissions".
#[derive(Debug, Error)]
pub enum ResolveError<E>
where
    E: Error + 'static,
{
    /// The role store failed, the whole batch was discarded.
    #[error("cannot determine custom role permissions: {0}")]
    Store(#[source] E),
}
