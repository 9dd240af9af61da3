//! Session description files
//!
//! ```json
//! { "sequences": [ { "name": "main", "tracks": [
//!     { "name": "V1", "clips": [
//!         { "name": "intro", "asset": "cam1.mov", "start": 0, "duration": 2000000 } ] } ] } ] }
//! ```
//!
//! Times are microseconds. Loading starts a dispatcher on a fresh session
//! and attaches every element through the `session.attach` command.

use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use montage_core::model::{AssetCategory, AssetRef, Duration, LocatingPin, MObject, Time};
use montage_core::session_commands::ATTACH;
use montage_core::{log_op_end, log_op_error, log_op_start};
use montage_core::{Placement, PlacementId, Session, SessionError};
use montage_core_types::SessionOp;
use montage_engine::{Dispatcher, EngineConfig, SessionCommandService};
use serde::Deserialize;

const SHUTDOWN_TIMEOUT: StdDuration = StdDuration::from_secs(10);

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionFile {
    #[serde(default)]
    pub sequences: Vec<SequenceSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SequenceSpec {
    pub name: String,
    #[serde(default)]
    pub tracks: Vec<TrackSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackSpec {
    pub name: String,
    #[serde(default)]
    pub clips: Vec<ClipSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClipSpec {
    pub name: String,
    pub asset: String,
    pub start: i64,
    pub duration: i64,
}

impl SessionFile {
    pub fn read(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("can't read {}: {}", path.display(), e))?;
        let file: SessionFile = serde_json::from_str(&text)?;
        file.validate()?;
        Ok(file)
    }

    fn validate(&self) -> Result<(), String> {
        let clips = self
            .sequences
            .iter()
            .flat_map(|s| &s.tracks)
            .flat_map(|t| &t.clips);
        for clip in clips {
            if clip.duration <= 0 {
                return Err(format!("clip '{}' needs a positive duration", clip.name));
            }
        }
        Ok(())
    }
}

/// Session populated from a file, with its dispatcher still running
pub struct LoadedSession {
    pub session: Arc<Session>,
    dispatcher: Arc<Dispatcher>,
}

impl LoadedSession {
    /// Shut the dispatcher down and wait for its thread
    pub fn close(self) -> Result<(), Box<dyn std::error::Error>> {
        let (tx, rx) = mpsc::channel();
        self.dispatcher.shutdown(move |outcome| {
            let _ = tx.send(outcome);
        })?;
        match rx.recv_timeout(SHUTDOWN_TIMEOUT)? {
            Some(message) => Err(message.into()),
            None => Ok(()),
        }
    }
}

pub fn load(path: &Path, config: &EngineConfig) -> Result<LoadedSession, Box<dyn std::error::Error>> {
    let file = SessionFile::read(path)?;
    let session = Arc::new(Session::new()?);
    let dispatcher = Dispatcher::start(session.clone(), config, |outcome| {
        if let Some(message) = outcome {
            tracing::error!(error = %message, "session loop failed");
        }
    })?;
    let service = SessionCommandService::new(dispatcher.clone());

    let started = Instant::now();
    log_op_start!(SessionOp::SessionLoad, path = %path.display());
    let outcome = populate(&service, &file).and_then(|count| {
        dispatcher.await_state_processed()?;
        match dispatcher.last_error() {
            Some(err) => Err(err),
            None => Ok(count),
        }
    });
    let duration_ms = started.elapsed().as_millis() as u64;

    let loaded = LoadedSession {
        session,
        dispatcher,
    };
    match outcome {
        Ok(count) => {
            log_op_end!(SessionOp::SessionLoad, duration_ms = duration_ms, placement_count = count);
            Ok(loaded)
        }
        Err(err) => {
            log_op_error!(SessionOp::SessionLoad, err.clone(), duration_ms = duration_ms);
            discard(loaded);
            Err(err.into())
        }
    }
}

/// Close a session whose load failed; the load error is reported instead
fn discard(loaded: LoadedSession) {
    if let Err(close_err) = loaded.close() {
        tracing::warn!(error = %close_err, "dispatcher shutdown after failed load");
    }
}

fn attach(
    service: &SessionCommandService,
    placement: Placement,
    scope: PlacementId,
) -> Result<PlacementId, SessionError> {
    let id = placement.id();
    service.trigger(ATTACH, (service.session().handle(), placement, scope))?;
    Ok(id)
}

fn populate(service: &SessionCommandService, file: &SessionFile) -> Result<usize, SessionError> {
    let root = service.session().index().root_id();
    let mut count = 0;
    for sequence in &file.sequences {
        let seq = attach(service, Placement::new(MObject::sequence(&sequence.name)), root)?;
        count += 1;
        for track in &sequence.tracks {
            let fork = attach(service, Placement::new(MObject::fork(&track.name)), seq)?;
            count += 1;
            for clip in &track.clips {
                let placement = Placement::new(MObject::clip(
                    &clip.name,
                    AssetRef::new(AssetCategory::Video, clip.asset.as_str()),
                    Duration(clip.duration),
                ))
                .with_pin(LocatingPin::Fixed {
                    start: Time(clip.start),
                });
                attach(service, placement, fork)?;
                count += 1;
            }
        }
    }
    Ok(count)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use montage_core::logging_facility::init_test_capture;
    use tracing::Level;

    #[test]
    fn test_discard_logs_failed_shutdown() {
        // GIVEN a loaded session whose dispatcher was already shut down
        let capture = init_test_capture();
        let session = Arc::new(Session::new().unwrap());
        let dispatcher = Dispatcher::start(session.clone(), &EngineConfig::default(), |_| {}).unwrap();
        let (tx, rx) = mpsc::channel();
        dispatcher
            .shutdown(move |outcome| {
                let _ = tx.send(outcome);
            })
            .unwrap();
        rx.recv_timeout(SHUTDOWN_TIMEOUT).unwrap();

        // WHEN it is discarded after a failed load
        discard(LoadedSession {
            session,
            dispatcher,
        });

        // THEN the refused second shutdown is logged as a warning
        let warned = capture.events().into_iter().any(|e| {
            e.level == Level::WARN
                && e.field("message") == Some("dispatcher shutdown after failed load")
                && e.field("error").is_some_and(|m| m.contains("already shut down"))
        });
        assert!(warned);
    }

    #[test]
    fn test_read_rejects_zero_duration() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(
            &path,
            r#"{ "sequences": [ { "name": "s", "tracks": [ { "name": "V1", "clips": [
                { "name": "still", "asset": "a", "start": 0, "duration": 0 } ] } ] } ] }"#,
        )
        .unwrap();

        let err = SessionFile::read(&path).unwrap_err();

        assert!(err.to_string().contains("positive duration"));
    }
}
