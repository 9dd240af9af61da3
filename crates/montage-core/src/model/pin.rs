//! Positioning constraints carried by a placement

use serde::{Deserialize, Serialize};

use super::time::{Duration, Time};
use crate::placement::PlacementId;

/// One link of a placement's constraint chain
///
/// Pins are applied in order; a later pin overrides what an earlier one
/// decided for the same coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "pin", rename_all = "snake_case")]
pub enum LocatingPin {
    /// Absolute start time
    Fixed { start: Time },
    /// Output onto the given fork (track) placement
    Track { fork: PlacementId },
    /// Start relative to the resolved start of another placement
    Relative { anchor: PlacementId, offset: Duration },
    /// Move whatever start was resolved so far
    Shift { offset: Duration },
}

/// Fully resolved location of a placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplicitPosition {
    pub start: Time,
    pub track: Option<PlacementId>,
}
