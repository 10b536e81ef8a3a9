use super::*;

mod continuation;
mod deferred;
mod handler;
mod resolution;

pub use deferred::{Deferred, PromiseView};
pub(crate) use deferred::PromiseCore;

use continuation::{Callback, Reaction, wrap};
use handler::{FulfilledHandler, Handler, PendingHandler, RejectedHandler};

/// Which side of a continuation pair a settlement notifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Settlement {
    Fulfill,
    Reject,
}

impl Settlement {
    pub(crate) fn state(self) -> &'static str {
        match self {
            Self::Fulfill => "fulfilled",
            Self::Reject => "rejected",
        }
    }

    fn capability_name(self) -> &'static str {
        match self {
            Self::Fulfill => "resolve",
            Self::Reject => "reject",
        }
    }

    fn settled_handler(self, value: Value) -> Rc<dyn Handler> {
        match self {
            Self::Fulfill => Rc::new(FulfilledHandler::new(value)),
            Self::Reject => Rc::new(RejectedHandler::new(value)),
        }
    }
}

fn first_argument(args: &[Value]) -> Value {
    args.first().cloned().unwrap_or(Value::Undefined)
}
