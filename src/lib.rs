//! Promise/A+ deferreds for single-threaded hosts.
//!
//! A [`PromiseRuntime`] hands out [`Deferred`] triples. Producers settle them
//! with [`Deferred::resolve`] / [`Deferred::reject`]; consumers only ever see
//! the [`PromiseView`] and register continuations with [`PromiseView::then`].
//! Continuations always run through the injected [`TaskScheduler`], never
//! inside the call that registered or settled them.
//!
//! ```
//! use std::rc::Rc;
//! use deferred_promise::{MicrotaskQueue, PromiseRuntime, Value};
//!
//! let queue = Rc::new(MicrotaskQueue::new());
//! let runtime = PromiseRuntime::new(queue.clone());
//! let deferred = runtime.defer();
//! let doubled = deferred.promise().then(
//!     Some(Value::function("double", |_, args| {
//!         Ok(Value::Number(args[0].as_number().unwrap_or(0.0) * 2.0))
//!     })),
//!     None,
//! );
//! deferred.resolve(Value::from(21)).unwrap();
//! queue.run_until_idle().unwrap();
//! # let _ = doubled;
//! ```

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

mod core_impl;
mod runtime_state;
mod runtime_values;
mod scheduler;

pub use core_impl::{Deferred, PromiseView};
pub use runtime_state::PromiseRuntime;
pub use runtime_values::{Completion, ErrorKind, ErrorValue, FunctionValue, ObjectValue, Property, Value};
pub use scheduler::{MicrotaskQueue, Task, TaskScheduler};

use core_impl::PromiseCore;
use runtime_state::RuntimeShared;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A deferred was resolved or rejected with its own public promise.
    #[error("TypeError: promise #{promise} cannot be resolved with itself")]
    SelfResolution { promise: usize },
    #[error("microtask step limit exceeded: limit={limit}, steps={steps}")]
    StepLimitExceeded { limit: usize, steps: usize },
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// The value a script-level caller observes when this error is thrown at
    /// it, e.g. from inside a capability function.
    pub fn into_reason(self) -> Value {
        let kind = match &self {
            Self::SelfResolution { .. } | Self::Config(_) => ErrorKind::TypeError,
            Self::StepLimitExceeded { .. } => ErrorKind::RangeError,
        };
        let message = match self {
            Self::SelfResolution { promise } => {
                format!("promise #{promise} cannot be resolved with itself")
            }
            Self::StepLimitExceeded { limit, steps } => {
                format!("microtask step limit exceeded: limit={limit}, steps={steps}")
            }
            Self::Config(message) => message,
        };
        Value::error(kind, message)
    }
}
