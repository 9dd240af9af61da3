//! Model objects placed into the session
//!
//! The set of kinds is closed. Type-filtered queries use [`MObjectKind`],
//! which every payload struct implements and `MObject` implements as the
//! supertype accepting any kind.

use serde::{Deserialize, Serialize};

use super::asset::AssetRef;
use super::time::Duration;

/// Subject of the model root placement
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionRoot {}

/// Top-level container for a timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub name: String,
}

/// A track: groups elements and supplies their output track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fork {
    pub name: String,
}

/// Media clip referencing a source asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clip {
    pub name: String,
    pub asset: AssetRef,
    pub duration: Duration,
}

/// Processing effect attached over a stretch of time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Effect {
    pub name: String,
    pub asset: AssetRef,
    pub duration: Duration,
}

/// Marker without media, e.g. a comment on the timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MObject {
    Root(SessionRoot),
    Sequence(Sequence),
    Fork(Fork),
    Clip(Clip),
    Effect(Effect),
    Label(Label),
}

impl MObject {
    pub fn sequence(name: impl Into<String>) -> Self {
        MObject::Sequence(Sequence { name: name.into() })
    }

    pub fn fork(name: impl Into<String>) -> Self {
        MObject::Fork(Fork { name: name.into() })
    }

    pub fn clip(name: impl Into<String>, asset: AssetRef, duration: Duration) -> Self {
        MObject::Clip(Clip {
            name: name.into(),
            asset,
            duration,
        })
    }

    pub fn effect(name: impl Into<String>, asset: AssetRef, duration: Duration) -> Self {
        MObject::Effect(Effect {
            name: name.into(),
            asset,
            duration,
        })
    }

    pub fn label(text: impl Into<String>) -> Self {
        MObject::Label(Label { text: text.into() })
    }

    /// Short tag of the variant, stable across releases
    pub fn kind_name(&self) -> &'static str {
        match self {
            MObject::Root(_) => SessionRoot::NAME,
            MObject::Sequence(_) => Sequence::NAME,
            MObject::Fork(_) => Fork::NAME,
            MObject::Clip(_) => Clip::NAME,
            MObject::Effect(_) => Effect::NAME,
            MObject::Label(_) => Label::NAME,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            MObject::Root(_) => "root",
            MObject::Sequence(s) => &s.name,
            MObject::Fork(f) => &f.name,
            MObject::Clip(c) => &c.name,
            MObject::Effect(e) => &e.name,
            MObject::Label(l) => &l.text,
        }
    }

    /// Length on the timeline, for elements that occupy time
    pub fn duration(&self) -> Option<Duration> {
        match self {
            MObject::Clip(c) => Some(c.duration),
            MObject::Effect(e) => Some(e.duration),
            _ => None,
        }
    }

    pub fn asset(&self) -> Option<&AssetRef> {
        match self {
            MObject::Clip(c) => Some(&c.asset),
            MObject::Effect(e) => Some(&e.asset),
            _ => None,
        }
    }

    pub fn is<K: MObjectKind>(&self) -> bool {
        K::downcast(self).is_some()
    }
}

impl std::fmt::Display for MObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.kind_name(), self.name())
    }
}

/// Compile-time filter over model object kinds
///
/// `downcast` is resolved per call site through monomorphization; queries
/// for `MObject` accept every element.
pub trait MObjectKind: Send + Sync + 'static {
    const NAME: &'static str;

    fn downcast(obj: &MObject) -> Option<&Self>;
}

impl MObjectKind for MObject {
    const NAME: &'static str = "mobject";

    fn downcast(obj: &MObject) -> Option<&Self> {
        Some(obj)
    }
}

macro_rules! impl_mobject_kind {
    ($ty:ident, $name:literal) => {
        impl MObjectKind for $ty {
            const NAME: &'static str = $name;

            fn downcast(obj: &MObject) -> Option<&Self> {
                match obj {
                    MObject::$ty(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

impl MObjectKind for SessionRoot {
    const NAME: &'static str = "root";

    fn downcast(obj: &MObject) -> Option<&Self> {
        match obj {
            MObject::Root(inner) => Some(inner),
            _ => None,
        }
    }
}

impl_mobject_kind!(Sequence, "sequence");
impl_mobject_kind!(Fork, "fork");
impl_mobject_kind!(Clip, "clip");
impl_mobject_kind!(Effect, "effect");
impl_mobject_kind!(Label, "label");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::asset::AssetCategory;

    #[test]
    fn test_downcast_filters_by_kind() {
        let clip = MObject::clip(
            "intro",
            AssetRef::new(AssetCategory::Video, "cam1"),
            Duration::from_millis(500),
        );

        assert!(clip.is::<Clip>());
        assert!(clip.is::<MObject>());
        assert!(!clip.is::<Fork>());
        assert_eq!(Clip::downcast(&clip).map(|c| c.name.as_str()), Some("intro"));
    }

    #[test]
    fn test_only_timed_kinds_have_duration() {
        assert!(MObject::fork("V1").duration().is_none());
        assert!(MObject::label("note").duration().is_none());
        let fx = MObject::effect(
            "blur",
            AssetRef::new(AssetCategory::Effect, "blur"),
            Duration(10),
        );
        assert_eq!(fx.duration(), Some(Duration(10)));
    }

    #[test]
    fn test_display_names_kind() {
        assert_eq!(MObject::sequence("main").to_string(), "sequence(main)");
    }
}
