use super::*;

// Foreign thenables may call back synchronously into another thenable, so
// assimilation can recurse as deep as the host's chain.
const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROWTH: usize = 32 * 1024 * 1024;

impl PromiseCore {
    /// Resolution procedure shared by `resolve` and `reject` on a pending
    /// promise: adopt another promise, assimilate a thenable, or settle.
    pub(crate) fn finish(self: &Rc<Self>, value: Value, method: Settlement) -> Result<PromiseView> {
        if let Value::Promise(source) = &value {
            self.adopt(source);
            return Ok(self.view());
        }

        if value.is_object_like() {
            let then = match value.get("then") {
                Ok(then) => then,
                Err(thrown) => {
                    self.runtime.trace_promise_line(|| {
                        format!("[promise] #{} then lookup threw {thrown}", self.id)
                    });
                    return self.reject(thrown);
                }
            };
            if then.is_callable() {
                self.assimilate(&value, &then)?;
                return Ok(self.view());
            }
        }

        self.transition(value, method);
        Ok(self.view())
    }

    fn adopt(self: &Rc<Self>, source: &PromiseView) {
        tracing::debug!(promise = self.id, source = source.id(), "adopting promise");
        self.runtime
            .trace_promise_line(|| format!("[promise] #{} adopts #{}", self.id, source.id()));
        source.then(
            Some(self.capability_function(Settlement::Fulfill)),
            Some(self.capability_function(Settlement::Reject)),
        );
    }

    fn assimilate(self: &Rc<Self>, thenable: &Value, then: &Value) -> Result<()> {
        tracing::debug!(promise = self.id, "assimilating thenable");
        self.runtime
            .trace_promise_line(|| format!("[promise] #{} assimilates thenable", self.id));

        let called = Rc::new(Cell::new(false));
        let resolve = self.latched_capability(&called, Settlement::Fulfill);
        let reject = self.latched_capability(&called, Settlement::Reject);
        let outcome = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
            then.call(thenable, &[resolve, reject])
        });

        match outcome {
            Ok(_) => Ok(()),
            Err(thrown) if !called.get() => self.reject(thrown).map(|_| ()),
            Err(thrown) => {
                self.runtime.trace_promise_line(|| {
                    format!("[promise] #{} ignored throw after callback: {thrown}", self.id)
                });
                Ok(())
            }
        }
    }

    /// One of the pair handed to a foreign `then`. Whichever of the pair runs
    /// first wins; every later call is ignored.
    fn latched_capability(self: &Rc<Self>, called: &Rc<Cell<bool>>, method: Settlement) -> Value {
        let core = Rc::clone(self);
        let called = Rc::clone(called);
        Value::function(method.capability_name(), move |_, args| {
            if called.replace(true) {
                return Ok(Value::Undefined);
            }
            core.settle(method, first_argument(args))
                .map(|_| Value::Undefined)
                .map_err(Error::into_reason)
        })
    }

    fn transition(self: &Rc<Self>, value: Value, method: Settlement) {
        let current = self.handler();
        // A getter or thenable may already have settled this promise
        // re-entrantly while the value was being inspected.
        if current.is_settled() {
            self.runtime.trace_promise_line(|| {
                format!("[promise] #{} already {}, dropping {value}", self.id, current.state())
            });
            return;
        }

        let reactions = current.detach_reactions();
        self.replace_handler(method.settled_handler(value.clone()));
        tracing::debug!(promise = self.id, state = method.state(), "settled");
        self.runtime.trace_promise_line(|| {
            format!("[promise] #{} {} value={value}", self.id, method.state())
        });

        let Some(reactions) = reactions.filter(|reactions| !reactions.is_empty()) else {
            return;
        };
        self.runtime.submit(
            format!("notify #{} {} reactions={}", self.id, method.state(), reactions.len()),
            Box::new(move || {
                for reaction in reactions {
                    reaction.into_side(method)(value.clone());
                }
            }),
        );
    }
}
