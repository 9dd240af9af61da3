pub mod asset;
pub mod mobject;
pub mod pin;
pub mod time;

pub use asset::{AssetCategory, AssetId, AssetRef};
pub use mobject::{Clip, Effect, Fork, Label, MObject, MObjectKind, SessionRoot, Sequence};
pub use pin::{ExplicitPosition, LocatingPin};
pub use time::{Duration, Time, TimeSpan};
