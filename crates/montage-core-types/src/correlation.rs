//! Request correlation across the session loop hop
//!
//! A front end submits a command on its own thread and the dispatcher runs
//! it later on the session thread. The [`RequestContext`] travels with the
//! queued command, so both sides log the same `request_id` and the loop can
//! report how long the command waited.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one submitted command request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for RequestId {
    type Err = uuid::Error;

    /// Parse a `request_id` as it appears in log output
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Travels with a queued command from submission to dispatch
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    request_id: RequestId,
    submitted: Instant,
}

impl RequestContext {
    /// Fresh request, submitted now
    pub fn new() -> Self {
        Self {
            request_id: RequestId::new(),
            submitted: Instant::now(),
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Time since submission
    pub fn queued_for(&self) -> Duration {
        self.submitted.elapsed()
    }

    /// [`RequestContext::queued_for`] in whole milliseconds, as logged
    pub fn queued_ms(&self) -> u64 {
        self.queued_for().as_millis() as u64
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
