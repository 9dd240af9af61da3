//! Fixture: the segmented, fully resolved timeline derived from the session
//!
//! A fixture is rebuilt from scratch out of a contents query over the
//! placement index. Every timed element (clip, effect) is resolved to an
//! explicit position, then the timeline is cut at every element boundary.
//! Within one segment the set of active elements is constant, which is what
//! the render builder needs.
//!
//! ## Digest
//!
//! The digest is a SHA-256 over the canonical JSON of an ID-free view of
//! the segments: elements are hashed by kind, name and timing, tracks by
//! their position in the scope tree. Placement IDs and the build timestamp
//! are left out, so two builds over the same structure have the same digest
//! even across sessions, and consumers can skip propagation.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::Result;
use crate::index::PlacementIndex;
use crate::model::{Duration, MObject, Time, TimeSpan};
use crate::placement::PlacementId;
use crate::query::{self, QueryResolver};
use crate::scope::Scope;

/// A timed element with its resolved position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplicitPlacement {
    pub id: PlacementId,
    pub kind: String,
    pub name: String,
    pub start: Time,
    pub duration: Duration,
    pub track: Option<PlacementId>,
}

impl ExplicitPlacement {
    pub fn span(&self) -> TimeSpan {
        TimeSpan::new(self.start, self.duration)
    }
}

/// Stretch of the timeline with a constant set of active elements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub span: TimeSpan,
    /// Ordered by track position, then start, then tree position
    pub elements: Vec<ExplicitPlacement>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Fixture {
    segments: Vec<Segment>,
    digest: String,
    built_at: DateTime<Utc>,
}

impl Fixture {
    /// Fixture of an empty session
    pub fn empty() -> Self {
        Self {
            segments: Vec::new(),
            digest: hash_segments(&[], &TreeOrder::default()).unwrap_or_default(),
            built_at: Utc::now(),
        }
    }

    /// Derive a fresh fixture from the current index contents
    ///
    /// # Errors
    ///
    /// `InvalidPlacement`/`NotInSession` if a placement can't be resolved,
    /// `Serialization` if the digest can't be computed.
    pub fn build(index: &Arc<PlacementIndex>) -> Result<Self> {
        let resolver: Arc<dyn QueryResolver> = index.clone();
        let root = Scope::new(index.root_id());

        let mut elements = Vec::new();
        let mut order = TreeOrder::default();
        for placement in query::contents::<MObject>(resolver, root)? {
            order.record(placement.id());
            let duration = match placement.subject().duration() {
                Some(d) if d.is_positive() => d,
                _ => continue,
            };
            let position = placement.resolve(index)?;
            elements.push(ExplicitPlacement {
                id: placement.id(),
                kind: placement.subject().kind_name().to_string(),
                name: placement.subject().name().to_string(),
                start: position.start,
                duration,
                track: position.track,
            });
        }

        let segments = segment(elements, &order);
        let digest = hash_segments(&segments, &order)?;
        tracing::debug!(segment_count = segments.len(), %digest, "fixture built");
        Ok(Self {
            segments,
            digest,
            built_at: Utc::now(),
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Hex SHA-256 of the segment structure
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Segment active at `time`, if any
    pub fn segment_at(&self, time: Time) -> Option<&Segment> {
        self.segments.iter().find(|s| s.span.contains(time))
    }

    /// From the first segment start to the last segment end
    pub fn span(&self) -> Option<TimeSpan> {
        let first = self.segments.first()?;
        let last = self.segments.last()?;
        Some(TimeSpan::between(first.span.start, last.span.end))
    }
}

/// Pre-order position of every placement seen while building
#[derive(Debug, Default)]
struct TreeOrder(HashMap<PlacementId, usize>);

impl TreeOrder {
    fn record(&mut self, id: PlacementId) {
        let next = self.0.len();
        self.0.entry(id).or_insert(next);
    }

    fn of(&self, id: PlacementId) -> Option<usize> {
        self.0.get(&id).copied()
    }

    fn track_of(&self, element: &ExplicitPlacement) -> Option<usize> {
        element.track.and_then(|t| self.of(t))
    }
}

fn segment(mut elements: Vec<ExplicitPlacement>, order: &TreeOrder) -> Vec<Segment> {
    elements.sort_by_key(|e| (order.track_of(e), e.start, order.of(e.id)));

    let cuts: BTreeSet<Time> = elements
        .iter()
        .flat_map(|e| [e.span().start, e.span().end])
        .collect();
    let cuts: Vec<Time> = cuts.into_iter().collect();

    cuts.windows(2)
        .filter_map(|w| {
            let span = TimeSpan::between(w[0], w[1]);
            let active: Vec<ExplicitPlacement> = elements
                .iter()
                .filter(|e| e.span().overlaps(&span))
                .cloned()
                .collect();
            (!active.is_empty()).then_some(Segment {
                span,
                elements: active,
            })
        })
        .collect()
}

#[derive(Serialize)]
struct DigestElement<'a> {
    kind: &'a str,
    name: &'a str,
    start: Time,
    duration: Duration,
    track: Option<usize>,
}

#[derive(Serialize)]
struct DigestSegment<'a> {
    span: TimeSpan,
    elements: Vec<DigestElement<'a>>,
}

fn hash_segments(segments: &[Segment], order: &TreeOrder) -> Result<String> {
    let structural: Vec<DigestSegment<'_>> = segments
        .iter()
        .map(|s| DigestSegment {
            span: s.span,
            elements: s
                .elements
                .iter()
                .map(|e| DigestElement {
                    kind: &e.kind,
                    name: &e.name,
                    start: e.start,
                    duration: e.duration,
                    track: order.track_of(e),
                })
                .collect(),
        })
        .collect();
    let canonical = serde_json::to_string(&structural)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}
