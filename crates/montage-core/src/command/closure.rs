//! Argument closure: the type-erased argument value bound to a command

use std::any::{Any, TypeId};
use std::fmt::Debug;
use std::sync::Arc;

use crate::command::CommandId;
use crate::errors::{Result, SessionError};

/// Bounds for values usable as command arguments or mementos
///
/// Tuples work as multi-argument lists, e.g. `(PlacementId, Time)`.
pub trait CommandArgs: Any + Clone + PartialEq + Debug + Send + Sync {}

impl<T> CommandArgs for T where T: Any + Clone + PartialEq + Debug + Send + Sync {}

pub(crate) type ErasedValue = dyn Any + Send + Sync;

type ErasedEq = fn(&ErasedValue, &ErasedValue) -> bool;

pub(crate) fn erased_eq<T: CommandArgs>(a: &ErasedValue, b: &ErasedValue) -> bool {
    match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

#[derive(Clone)]
struct Bound {
    value: Arc<ErasedValue>,
    eq: ErasedEq,
    repr: String,
}

/// Argument slot of a command, typed by its definition
#[derive(Clone)]
pub struct CmdClosure {
    arg_type: TypeId,
    arg_type_name: &'static str,
    bound: Option<Bound>,
}

impl CmdClosure {
    pub(crate) fn for_type<A: CommandArgs>() -> Self {
        Self {
            arg_type: TypeId::of::<A>(),
            arg_type_name: std::any::type_name::<A>(),
            bound: None,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    pub fn accepts<A: CommandArgs>(&self) -> bool {
        TypeId::of::<A>() == self.arg_type
    }

    pub fn arg_type_name(&self) -> &'static str {
        self.arg_type_name
    }

    /// Store argument values, replacing earlier ones
    ///
    /// # Errors
    ///
    /// `InvalidArguments` if `A` is not the type the definition expects.
    pub(crate) fn bind<A: CommandArgs>(&mut self, command_id: &CommandId, args: A) -> Result<()> {
        if !self.accepts::<A>() {
            return Err(SessionError::InvalidArguments {
                command_id: command_id.to_string(),
                expected: self.arg_type_name.to_string(),
            });
        }
        let repr = format!("{:?}", args);
        self.bound = Some(Bound {
            value: Arc::new(args),
            eq: erased_eq::<A>,
            repr,
        });
        Ok(())
    }

    pub(crate) fn unbind(&mut self) {
        self.bound = None;
    }

    pub(crate) fn value(&self) -> Option<Arc<ErasedValue>> {
        self.bound.as_ref().map(|b| b.value.clone())
    }

    /// Typed view of the bound arguments
    pub fn args<A: CommandArgs>(&self) -> Option<&A> {
        self.bound.as_ref().and_then(|b| b.value.downcast_ref::<A>())
    }
}

impl PartialEq for CmdClosure {
    fn eq(&self, other: &Self) -> bool {
        if self.arg_type != other.arg_type {
            return false;
        }
        match (&self.bound, &other.bound) {
            (None, None) => true,
            (Some(a), Some(b)) => (a.eq)(a.value.as_ref(), b.value.as_ref()),
            _ => false,
        }
    }
}

impl From<&CmdClosure> for bool {
    fn from(closure: &CmdClosure) -> bool {
        closure.is_bound()
    }
}

impl std::fmt::Debug for CmdClosure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl std::fmt::Display for CmdClosure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.bound {
            Some(b) => write!(f, "Closure({})", b.repr),
            None => write!(f, "Closure(<unbound {}>)", self.arg_type_name),
        }
    }
}
