use super::*;

pub(crate) struct PromiseCore {
    pub(crate) id: usize,
    handler: RefCell<Rc<dyn Handler>>,
    pub(crate) runtime: Rc<RuntimeShared>,
}

impl PromiseCore {
    pub(crate) fn new(runtime: &Rc<RuntimeShared>) -> Rc<Self> {
        let id = runtime.allocate_promise_id();
        runtime.trace_promise_line(|| format!("[promise] create #{id}"));
        let pending: Rc<dyn Handler> = Rc::new(PendingHandler::default());
        Rc::new(Self {
            id,
            handler: RefCell::new(pending),
            runtime: Rc::clone(runtime),
        })
    }

    /// The current handler. Cloned out so no borrow is held while it runs
    /// user code that may re-enter this promise.
    pub(crate) fn handler(&self) -> Rc<dyn Handler> {
        Rc::clone(&self.handler.borrow())
    }

    pub(crate) fn replace_handler(&self, next: Rc<dyn Handler>) -> Rc<dyn Handler> {
        std::mem::replace(&mut *self.handler.borrow_mut(), next)
    }

    pub(crate) fn view(self: &Rc<Self>) -> PromiseView {
        PromiseView {
            core: Rc::clone(self),
        }
    }

    fn is_own_promise(&self, value: &Value) -> bool {
        matches!(value, Value::Promise(view) if std::ptr::eq(Rc::as_ptr(&view.core), self))
    }

    pub(crate) fn settle(self: &Rc<Self>, method: Settlement, value: Value) -> Result<PromiseView> {
        if self.is_own_promise(&value) {
            tracing::debug!(promise = self.id, "rejected self-resolution");
            return Err(Error::SelfResolution { promise: self.id });
        }
        let handler = self.handler();
        match method {
            Settlement::Fulfill => handler.resolve(self, value),
            Settlement::Reject => handler.reject(self, value),
        }
    }

    pub(crate) fn resolve(self: &Rc<Self>, value: Value) -> Result<PromiseView> {
        self.settle(Settlement::Fulfill, value)
    }

    pub(crate) fn reject(self: &Rc<Self>, reason: Value) -> Result<PromiseView> {
        self.settle(Settlement::Reject, reason)
    }

    /// `resolve`/`reject` exposed as a callable value returning `undefined`.
    /// A self-resolution error surfaces to the caller as a thrown `TypeError`.
    pub(crate) fn capability_function(self: &Rc<Self>, method: Settlement) -> Value {
        let core = Rc::clone(self);
        Value::function(method.capability_name(), move |_, args| {
            core.settle(method, first_argument(args))
                .map(|_| Value::Undefined)
                .map_err(Error::into_reason)
        })
    }
}

/// Consumer-side handle: can observe a promise but never settle it.
#[derive(Clone)]
pub struct PromiseView {
    core: Rc<PromiseCore>,
}

impl PromiseView {
    /// Registers continuations and returns the promise they settle.
    /// Non-callable arguments pass the outcome through unchanged.
    pub fn then(&self, on_fulfilled: Option<Value>, on_rejected: Option<Value>) -> PromiseView {
        self.core.handler().then(&self.core, on_fulfilled, on_rejected)
    }

    /// Runtime-unique id, as used in trace lines and error messages.
    pub fn id(&self) -> usize {
        self.core.id
    }
}

impl PartialEq for PromiseView {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }
}

impl Eq for PromiseView {}

impl fmt::Debug for PromiseView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PromiseView").field(&self.core.id).finish()
    }
}

/// Producer-side handle for one promise.
#[derive(Clone)]
pub struct Deferred {
    core: Rc<PromiseCore>,
}

impl Deferred {
    pub(crate) fn from_core(core: Rc<PromiseCore>) -> Self {
        Self { core }
    }

    pub fn promise(&self) -> PromiseView {
        self.core.view()
    }

    /// Resolves with `value`, adopting it first when it is a promise or
    /// thenable. Only the first settlement counts; later calls return the
    /// promise unchanged.
    pub fn resolve(&self, value: Value) -> Result<PromiseView> {
        self.core.resolve(value)
    }

    pub fn reject(&self, reason: Value) -> Result<PromiseView> {
        self.core.reject(reason)
    }

    pub fn resolve_function(&self) -> Value {
        self.core.capability_function(Settlement::Fulfill)
    }

    pub fn reject_function(&self) -> Value {
        self.core.capability_function(Settlement::Reject)
    }

    /// Settles from inside a continuation wrapper, where there is no caller to
    /// hand an error back to: a failure becomes the rejection reason instead.
    pub(crate) fn settle_from_callback(&self, method: Settlement, value: Value) {
        let Err(err) = self.core.settle(method, value) else {
            return;
        };
        if let Err(err) = self.core.reject(err.into_reason()) {
            tracing::debug!(promise = self.core.id, %err, "continuation result dropped");
        }
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("promise", &self.core.id)
            .finish()
    }
}
