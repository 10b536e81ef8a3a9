use super::*;

/// Behavior of a promise in one state. A promise swaps its handler exactly
/// once, from [`PendingHandler`] to one of the settled handlers.
pub(crate) trait Handler {
    fn state(&self) -> &'static str;

    fn then(
        &self,
        promise: &Rc<PromiseCore>,
        on_fulfilled: Option<Value>,
        on_rejected: Option<Value>,
    ) -> PromiseView;

    fn resolve(&self, promise: &Rc<PromiseCore>, value: Value) -> Result<PromiseView>;

    fn reject(&self, promise: &Rc<PromiseCore>, reason: Value) -> Result<PromiseView>;

    /// Takes the continuations queued while pending. Settled handlers have
    /// none.
    fn detach_reactions(&self) -> Option<Vec<Reaction>> {
        None
    }

    fn is_settled(&self) -> bool {
        true
    }
}

#[derive(Default)]
pub(crate) struct PendingHandler {
    reactions: RefCell<Option<Vec<Reaction>>>,
}

impl Handler for PendingHandler {
    fn state(&self) -> &'static str {
        "pending"
    }

    fn then(
        &self,
        promise: &Rc<PromiseCore>,
        on_fulfilled: Option<Value>,
        on_rejected: Option<Value>,
    ) -> PromiseView {
        let deferred = Deferred::from_core(PromiseCore::new(&promise.runtime));
        let reaction = Reaction::new(&deferred, on_fulfilled, on_rejected);
        let queued = {
            let mut reactions = self.reactions.borrow_mut();
            let reactions = reactions.get_or_insert_with(Vec::new);
            reactions.push(reaction);
            reactions.len()
        };
        promise.runtime.trace_promise_line(|| {
            format!(
                "[promise] then #{} -> #{} queued={queued}",
                promise.id,
                deferred.promise().id()
            )
        });
        deferred.promise()
    }

    fn resolve(&self, promise: &Rc<PromiseCore>, value: Value) -> Result<PromiseView> {
        promise.finish(value, Settlement::Fulfill)
    }

    fn reject(&self, promise: &Rc<PromiseCore>, reason: Value) -> Result<PromiseView> {
        promise.finish(reason, Settlement::Reject)
    }

    fn detach_reactions(&self) -> Option<Vec<Reaction>> {
        self.reactions.borrow_mut().take()
    }

    fn is_settled(&self) -> bool {
        false
    }
}

/// Callbacks registered on a settled promise, flushed together by a single
/// scheduler submission. Registrations made after a flush started open a new
/// batch.
#[derive(Default)]
struct FlushBatch {
    callbacks: Rc<RefCell<Option<Vec<Callback>>>>,
}

impl FlushBatch {
    fn push(&self, promise: &Rc<PromiseCore>, outcome: &Value, state: &str, callback: Callback) {
        let opens_batch = {
            let mut callbacks = self.callbacks.borrow_mut();
            match callbacks.as_mut() {
                Some(batch) => {
                    batch.push(callback);
                    false
                }
                None => {
                    *callbacks = Some(vec![callback]);
                    true
                }
            }
        };
        if !opens_batch {
            return;
        }

        let callbacks = Rc::clone(&self.callbacks);
        let outcome = outcome.clone();
        promise.runtime.submit(
            format!("flush #{} {state}", promise.id),
            Box::new(move || {
                let batch = callbacks.borrow_mut().take().unwrap_or_default();
                for callback in batch {
                    callback(outcome.clone());
                }
            }),
        );
    }
}

pub(crate) struct FulfilledHandler {
    value: Value,
    batch: FlushBatch,
}

impl FulfilledHandler {
    pub(crate) fn new(value: Value) -> Self {
        Self {
            value,
            batch: FlushBatch::default(),
        }
    }
}

impl Handler for FulfilledHandler {
    fn state(&self) -> &'static str {
        "fulfilled"
    }

    fn then(
        &self,
        promise: &Rc<PromiseCore>,
        on_fulfilled: Option<Value>,
        _on_rejected: Option<Value>,
    ) -> PromiseView {
        let deferred = Deferred::from_core(PromiseCore::new(&promise.runtime));
        let wrapped = wrap(deferred.clone(), Settlement::Fulfill, on_fulfilled);
        self.batch.push(promise, &self.value, self.state(), wrapped);
        deferred.promise()
    }

    fn resolve(&self, promise: &Rc<PromiseCore>, _value: Value) -> Result<PromiseView> {
        Ok(promise.view())
    }

    fn reject(&self, promise: &Rc<PromiseCore>, _reason: Value) -> Result<PromiseView> {
        Ok(promise.view())
    }
}

pub(crate) struct RejectedHandler {
    reason: Value,
    batch: FlushBatch,
}

impl RejectedHandler {
    pub(crate) fn new(reason: Value) -> Self {
        Self {
            reason,
            batch: FlushBatch::default(),
        }
    }
}

impl Handler for RejectedHandler {
    fn state(&self) -> &'static str {
        "rejected"
    }

    fn then(
        &self,
        promise: &Rc<PromiseCore>,
        _on_fulfilled: Option<Value>,
        on_rejected: Option<Value>,
    ) -> PromiseView {
        let deferred = Deferred::from_core(PromiseCore::new(&promise.runtime));
        let wrapped = wrap(deferred.clone(), Settlement::Reject, on_rejected);
        self.batch.push(promise, &self.reason, self.state(), wrapped);
        deferred.promise()
    }

    fn resolve(&self, promise: &Rc<PromiseCore>, _value: Value) -> Result<PromiseView> {
        Ok(promise.view())
    }

    fn reject(&self, promise: &Rc<PromiseCore>, _reason: Value) -> Result<PromiseView> {
        Ok(promise.view())
    }
}
