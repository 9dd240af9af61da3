use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use montage_core::model::{AssetCategory, AssetRef, Duration, LocatingPin, MObject, Time};
use montage_core::{Command, CommandRegistry, Placement, Session, SessionError};
use montage_engine::{Dispatcher, EngineConfig};

/// How long tests wait for a callback before failing
#[allow(dead_code)]
pub const CALLBACK_TIMEOUT: StdDuration = StdDuration::from_secs(5);

#[allow(dead_code)]
pub fn new_session() -> Arc<Session> {
    Arc::new(Session::new().expect("session should be created"))
}

/// Short builder delay so idle builds follow quickly
#[allow(dead_code)]
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        builder_delay_ms: 5,
        ..EngineConfig::default()
    }
}

#[allow(dead_code)]
pub fn start(session: &Arc<Session>, config: &EngineConfig) -> Arc<Dispatcher> {
    Dispatcher::start(session.clone(), config, |_| {}).expect("dispatcher should start")
}

/// Callback forwarding its argument to the returned receiver
#[allow(dead_code)]
pub fn completion() -> (impl FnOnce(Option<String>) + Send + 'static, Receiver<Option<String>>) {
    let (tx, rx) = mpsc::channel();
    let callback = move |outcome: Option<String>| {
        let _ = tx.send(outcome);
    };
    (callback, rx)
}

#[allow(dead_code)]
pub fn clip_at(name: &str, start: i64, duration: i64) -> Placement {
    Placement::new(MObject::clip(
        name,
        AssetRef::new(AssetCategory::Video, name),
        Duration(duration),
    ))
    .with_pin(LocatingPin::Fixed { start: Time(start) })
}

/// Command adding its argument to a shared counter
#[allow(dead_code)]
pub fn define_counter(registry: &CommandRegistry, id: &str) -> (Command, Arc<AtomicI64>) {
    let counter = Arc::new(AtomicI64::new(0));
    let (op, capture, undo) = (counter.clone(), counter.clone(), counter.clone());
    let cmd = registry
        .define(id)
        .operation(move |n: &i64| {
            op.fetch_add(*n, Ordering::SeqCst);
            Ok(())
        })
        .capture_undo(move |_: &i64| Ok(capture.load(Ordering::SeqCst)))
        .undo_operation(move |_: &i64, previous: &i64| {
            undo.store(*previous, Ordering::SeqCst);
            Ok(())
        })
        .expect("definition should register");
    (cmd, counter)
}

/// Command appending its label to a shared log
#[allow(dead_code)]
pub fn define_recorder(registry: &CommandRegistry, id: &str) -> (Command, Arc<Mutex<Vec<String>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    let cmd = registry
        .define(id)
        .operation(move |label: &String| {
            sink.lock().expect("log lock").push(label.clone());
            Ok(())
        })
        .capture_undo(|_: &String| Ok(()))
        .undo_operation(|_: &String, _: &()| Ok(()))
        .expect("definition should register");
    (cmd, log)
}

/// Command whose operation always fails
#[allow(dead_code)]
pub fn define_failing(registry: &CommandRegistry, id: &str) -> Command {
    let command_id = id.to_string();
    registry
        .define(id)
        .operation(move |_: &i64| {
            Err(SessionError::OperationFailed {
                command_id: command_id.clone(),
                message: "boom".to_string(),
            })
        })
        .capture_undo(|_: &i64| Ok(()))
        .undo_operation(|_: &i64, _: &()| Ok(()))
        .expect("definition should register")
}
