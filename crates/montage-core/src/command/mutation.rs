//! Type-erased operations of a command
//!
//! A [`Mutation`] wraps the forward operation. An [`UndoMutation`] wraps a
//! capture function, run right before the forward operation to record a
//! [`Memento`] of the affected state, and an undo function that consumes
//! that memento together with the original arguments.

use std::any::Any;
use std::sync::Arc;

use crate::command::closure::{erased_eq, CommandArgs, ErasedValue};
use crate::command::CommandId;
use crate::errors::{Result, SessionError};

pub(crate) type ErasedOp = dyn Fn(&CommandId, &ErasedValue) -> Result<()> + Send + Sync;
pub(crate) type ErasedCapture = dyn Fn(&CommandId, &ErasedValue) -> Result<Memento> + Send + Sync;
pub(crate) type ErasedUndo = dyn Fn(&CommandId, &ErasedValue, &Memento) -> Result<()> + Send + Sync;

fn arguments<'a, A: CommandArgs>(id: &CommandId, args: &'a ErasedValue) -> Result<&'a A> {
    args.downcast_ref::<A>()
        .ok_or_else(|| SessionError::InvalidArguments {
            command_id: id.to_string(),
            expected: std::any::type_name::<A>().to_string(),
        })
}

/// Forward operation of a command
#[derive(Clone)]
pub struct Mutation {
    op: Arc<ErasedOp>,
}

impl Mutation {
    pub fn new<A, F>(op: F) -> Self
    where
        A: CommandArgs,
        F: Fn(&A) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            op: Arc::new(move |id: &CommandId, args: &ErasedValue| op(arguments::<A>(id, args)?)),
        }
    }

    /// # Errors
    ///
    /// Whatever the wrapped operation reports, or `InvalidArguments` if
    /// `args` is not of the definition's argument type.
    pub fn invoke(&self, id: &CommandId, args: &ErasedValue) -> Result<()> {
        (self.op)(id, args)
    }

    /// Both wrap the very same operation instance
    pub fn same_operation(&self, other: &Mutation) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.op) as *const (),
            Arc::as_ptr(&other.op) as *const (),
        )
    }
}

impl PartialEq for Mutation {
    fn eq(&self, other: &Self) -> bool {
        self.same_operation(other)
    }
}

impl std::fmt::Debug for Mutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Mutation({:p})", Arc::as_ptr(&self.op) as *const ())
    }
}

/// State captured before a command ran, needed to undo it
#[derive(Clone)]
pub struct Memento {
    value: Arc<ErasedValue>,
    eq: fn(&ErasedValue, &ErasedValue) -> bool,
    repr: String,
}

impl Memento {
    pub fn new<M: CommandArgs>(value: M) -> Self {
        let repr = format!("{:?}", value);
        Self {
            value: Arc::new(value),
            eq: erased_eq::<M>,
            repr,
        }
    }

    /// Typed view of the captured state
    pub fn get<M: Any>(&self) -> Option<&M> {
        self.value.downcast_ref::<M>()
    }
}

impl PartialEq for Memento {
    fn eq(&self, other: &Self) -> bool {
        (self.eq)(self.value.as_ref(), other.value.as_ref())
    }
}

impl std::fmt::Debug for Memento {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Memento({})", self.repr)
    }
}

/// Undo half of a command: capture function, undo function and the
/// memento of the last execution
#[derive(Clone)]
pub struct UndoMutation {
    capture: Arc<ErasedCapture>,
    undo: Arc<ErasedUndo>,
    memento: Option<Memento>,
}

impl UndoMutation {
    pub fn new<A, M, C, U>(capture: C, undo: U) -> Self
    where
        A: CommandArgs,
        M: CommandArgs,
        C: Fn(&A) -> Result<M> + Send + Sync + 'static,
        U: Fn(&A, &M) -> Result<()> + Send + Sync + 'static,
    {
        let capture = move |id: &CommandId, args: &ErasedValue| {
            capture(arguments::<A>(id, args)?).map(Memento::new)
        };
        let undo = move |id: &CommandId, args: &ErasedValue, memento: &Memento| {
            let state = memento.get::<M>().ok_or_else(|| SessionError::InvalidArguments {
                command_id: id.to_string(),
                expected: std::any::type_name::<M>().to_string(),
            })?;
            undo(arguments::<A>(id, args)?, state)
        };
        Self {
            capture: Arc::new(capture),
            undo: Arc::new(undo),
            memento: None,
        }
    }

    /// Run the capture function without storing its result
    ///
    /// # Errors
    ///
    /// Whatever the capture function reports.
    pub fn capture(&self, id: &CommandId, args: &ErasedValue) -> Result<Memento> {
        (self.capture)(id, args)
    }

    pub fn store(&mut self, memento: Memento) {
        self.memento = Some(memento);
    }

    pub fn memento(&self) -> Option<&Memento> {
        self.memento.as_ref()
    }

    pub fn has_memento(&self) -> bool {
        self.memento.is_some()
    }

    pub fn clear(&mut self) {
        self.memento = None;
    }

    /// Run the undo function against the stored memento
    ///
    /// # Errors
    ///
    /// `MissingMemento` if nothing was captured yet, otherwise whatever the
    /// undo function reports.
    pub fn run_undo(&self, id: &CommandId, args: &ErasedValue) -> Result<()> {
        let memento = self.memento.as_ref().ok_or_else(|| SessionError::MissingMemento {
            command_id: id.to_string(),
        })?;
        (self.undo)(id, args, memento)
    }

    /// Both wrap the same capture and undo functions
    pub fn same_operation(&self, other: &UndoMutation) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.capture) as *const (),
            Arc::as_ptr(&other.capture) as *const (),
        ) && std::ptr::eq(
            Arc::as_ptr(&self.undo) as *const (),
            Arc::as_ptr(&other.undo) as *const (),
        )
    }
}

impl PartialEq for UndoMutation {
    fn eq(&self, other: &Self) -> bool {
        self.same_operation(other) && self.memento == other.memento
    }
}

impl std::fmt::Debug for UndoMutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoMutation")
            .field("memento", &self.memento)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    #[test]
    fn test_mutation_invokes_typed_operation() {
        let target = Arc::new(AtomicI64::new(0));
        let t = target.clone();
        let m = Mutation::new(move |delta: &i64| {
            t.fetch_add(*delta, Ordering::SeqCst);
            Ok(())
        });
        let id = CommandId::new("test.add");

        m.invoke(&id, &5i64).unwrap();
        assert_eq!(target.load(Ordering::SeqCst), 5);

        let wrong = m.invoke(&id, &"five");
        assert!(matches!(wrong, Err(SessionError::InvalidArguments { .. })));
    }

    #[test]
    fn test_undo_requires_memento() {
        let target = Arc::new(AtomicI64::new(10));
        let (tc, tu) = (target.clone(), target.clone());
        let mut undo = UndoMutation::new(
            move |_: &i64| Ok(tc.load(Ordering::SeqCst)),
            move |_: &i64, old: &i64| {
                tu.store(*old, Ordering::SeqCst);
                Ok(())
            },
        );
        let id = CommandId::new("test.add");

        let missing = undo.run_undo(&id, &1i64);
        assert!(matches!(missing, Err(SessionError::MissingMemento { .. })));

        let memento = undo.capture(&id, &1i64).unwrap();
        assert!(!undo.has_memento());
        undo.store(memento);
        target.store(99, Ordering::SeqCst);

        undo.run_undo(&id, &1i64).unwrap();
        assert_eq!(target.load(Ordering::SeqCst), 10);
        assert_eq!(undo.memento().and_then(|m| m.get::<i64>()), Some(&10));

        undo.clear();
        assert!(!undo.has_memento());
    }

    #[test]
    fn test_mutation_equality_is_identity() {
        let a = Mutation::new(|_: &i32| Ok(()));
        let b = Mutation::new(|_: &i32| Ok(()));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
