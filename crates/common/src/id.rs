//! Identifier utilities.
//!
//! Every federated object is addressed by an origin-qualified URL ([`ObjectId`]).
//! Nodes also keep numeric local keys, but those never leave the node except
//! inside its own permalinks.

use std::fmt;

use serde::{Deserialize, Serialize};
use ulid::Ulid;
use url::Url;

use crate::error::{AppError, AppResult};

/// ID generator for entities.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based ID.
    ///
    /// ULIDs are lexicographically sortable and shorter than UUIDs as strings.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }

    /// Mint a new object id under `base` (`{base}/{kind}/{ulid}`).
    pub fn object_id(&self, base: &Url, kind: &str) -> AppResult<ObjectId> {
        let url = base.join(&format!("{kind}/{}", self.generate()))?;
        Ok(ObjectId(url))
    }

    /// Mint a new activity id under `base`.
    pub fn activity_id(&self, base: &Url, kind: &str) -> AppResult<Url> {
        Ok(base.join(&format!(
            "activities/{}/{}",
            kind.to_lowercase(),
            self.generate()
        ))?)
    }
}

/// Origin-qualified identifier of a federated object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(Url);

impl ObjectId {
    /// Wrap a URL.
    #[must_use]
    pub const fn new(url: Url) -> Self {
        Self(url)
    }

    /// Parse an identifier from a string.
    pub fn parse(s: &str) -> AppResult<Self> {
        Ok(Self(Url::parse(s)?))
    }

    /// The underlying URL.
    #[must_use]
    pub const fn inner(&self) -> &Url {
        &self.0
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The instance this object originates from.
    pub fn instance(&self) -> AppResult<InstanceId> {
        InstanceId::from_url(&self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl From<Url> for ObjectId {
    fn from(url: Url) -> Self {
        Self(url)
    }
}

impl From<ObjectId> for Url {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

/// A federated node, identified by its origin (`scheme://host[:port]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    /// Derive the instance from any URL it serves.
    pub fn from_url(url: &Url) -> AppResult<Self> {
        if url.host_str().is_none() {
            return Err(AppError::BadRequest(format!("url has no host: {url}")));
        }
        Ok(Self(url.origin().ascii_serialization()))
    }

    /// Host plus optional port, e.g. `alpha.example:8541`.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0
            .split_once("://")
            .map_or(self.0.as_str(), |(_, rest)| rest)
    }

    /// Host without port.
    #[must_use]
    pub fn host(&self) -> &str {
        let domain = self.domain();
        domain.rsplit_once(':').map_or(domain, |(host, _)| host)
    }

    /// Whether a configured domain pattern names this instance.
    ///
    /// Patterns may omit the port.
    #[must_use]
    pub fn matches_domain(&self, pattern: &str) -> bool {
        let pattern = pattern.trim().trim_end_matches('/').to_lowercase();
        let pattern = pattern
            .split_once("://")
            .map_or(pattern.as_str(), |(_, rest)| rest);
        pattern == self.domain() || pattern == self.host()
    }

    /// Base URL of the instance.
    pub fn base_url(&self) -> AppResult<Url> {
        Ok(Url::parse(&format!("{}/", self.0))?)
    }

    /// Shared inbox of the instance.
    pub fn inbox_url(&self) -> AppResult<Url> {
        Ok(self.base_url()?.join("inbox")?)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.domain())
    }
}
