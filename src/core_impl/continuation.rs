use super::*;

pub(crate) type Callback = Box<dyn FnOnce(Value)>;

/// A `then` registration waiting on a pending promise. Exactly one side runs.
pub(crate) struct Reaction {
    on_fulfilled: Callback,
    on_rejected: Callback,
}

impl Reaction {
    pub(crate) fn new(
        deferred: &Deferred,
        on_fulfilled: Option<Value>,
        on_rejected: Option<Value>,
    ) -> Self {
        Self {
            on_fulfilled: wrap(deferred.clone(), Settlement::Fulfill, on_fulfilled),
            on_rejected: wrap(deferred.clone(), Settlement::Reject, on_rejected),
        }
    }

    pub(crate) fn into_side(self, method: Settlement) -> Callback {
        match method {
            Settlement::Fulfill => self.on_fulfilled,
            Settlement::Reject => self.on_rejected,
        }
    }
}

/// Binds one `then` argument to the deferred that `then` returned.
///
/// A callable handler's return value resolves `deferred` and a throw rejects
/// it. Anything else forwards the incoming outcome unchanged through
/// `method`.
pub(crate) fn wrap(deferred: Deferred, method: Settlement, handler: Option<Value>) -> Callback {
    match handler.filter(Value::is_callable) {
        Some(handler) => Box::new(move |value| {
            match handler.call(&Value::Undefined, &[value]) {
                Ok(next) => deferred.settle_from_callback(Settlement::Fulfill, next),
                Err(thrown) => deferred.settle_from_callback(Settlement::Reject, thrown),
            }
        }),
        None => Box::new(move |value| deferred.settle_from_callback(method, value)),
    }
}
