//! Migration identifiers.
//!
//! An identifier is `YYYYMMDDHHMMSS-<suffix>`: the UTC time the migration was
//! written plus a unique suffix. The canonical string sorts the same way as
//! the parsed value, so identifiers can be compared either way.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{DashStoreError, Result};

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

static ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<ts>[0-9]{14})-(?P<suffix>[a-z0-9][a-z0-9_-]*)$")
        .expect("migration id pattern is valid")
});

/// Ordered, globally unique migration identifier.
///
/// Field order matters: derived `Ord` compares the timestamp first, then the
/// suffix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MigrationId {
    created_at: NaiveDateTime,
    suffix: String,
}

impl MigrationId {
    /// Parses an identifier from its canonical string form.
    pub fn parse(raw: &str) -> Result<Self> {
        let captures = ID_PATTERN
            .captures(raw)
            .ok_or_else(|| DashStoreError::InvalidIdentifier(raw.to_string()))?;

        let created_at = NaiveDateTime::parse_from_str(&captures["ts"], TIMESTAMP_FORMAT)
            .map_err(|_| DashStoreError::InvalidIdentifier(raw.to_string()))?;

        Ok(Self {
            created_at,
            suffix: captures["suffix"].to_string(),
        })
    }

    /// Builds a fresh identifier for a new migration named `slug`.
    ///
    /// The suffix is `<slug>-<8 hex chars>` so identifiers generated in the
    /// same second by different people still differ.
    pub fn generate(slug: &str) -> Result<Self> {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let now = Utc::now().format(TIMESTAMP_FORMAT);
        Self::parse(&format!("{}-{}-{}", now, slug, &token[..8]))
    }

    pub fn created_at(&self) -> NaiveDateTime {
        self.created_at
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

impl fmt::Display for MigrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.created_at.format(TIMESTAMP_FORMAT),
            self.suffix
        )
    }
}

impl FromStr for MigrationId {
    type Err = DashStoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for MigrationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MigrationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
