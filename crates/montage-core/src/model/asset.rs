//! Asset identity as seen by the session
//!
//! The asset layer owns naming and media details; the session only needs a
//! stable, comparable identity to reference from clips and effects.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetCategory {
    Audio,
    Video,
    Effect,
    Codec,
    Struct,
    Meta,
}

/// Opaque asset identifier handed out by the asset layer
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetRef {
    pub category: AssetCategory,
    pub id: AssetId,
}

impl AssetRef {
    pub fn new(category: AssetCategory, id: impl Into<String>) -> Self {
        Self {
            category,
            id: AssetId::new(id),
        }
    }
}

impl std::fmt::Display for AssetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}:{}", self.category, self.id.as_str())
    }
}
