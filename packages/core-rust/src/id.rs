//! Request identifiers and the source that generates them.
//!
//! A [`RequestId`] marks a single hop: one request handled by one service.
//! Its wire form is the canonical lowercase hyphenated UUID
//! (`xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A 128-bit identifier for one request.
///
/// Ordering and equality are those of the underlying UUID, so two ids parsed
/// from differently-cased strings compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generates a random (version 4) request id.
    #[must_use]
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// Builds an id from its raw 128-bit value.
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<RequestId> for Uuid {
    fn from(id: RequestId) -> Self {
        id.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `Hyphenated` always renders lowercase.
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl FromStr for RequestId {
    type Err = uuid::Error;

    /// Accepts any casing of the hyphenated form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Abstraction over request id generation for dependency injection.
///
/// Services use [`RandomIdSource`]; tests substitute a fixed sequence so the
/// generated id is known in advance.
pub trait IdSource: Send + Sync {
    /// Returns the id for the next request.
    fn next_id(&self) -> RequestId;
}

/// Default id source producing random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdSource;

impl IdSource for RandomIdSource {
    fn next_id(&self) -> RequestId {
        RequestId::new_v4()
    }
}
