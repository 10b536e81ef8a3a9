use super::*;

#[derive(Debug)]
pub(crate) struct TraceState {
    enabled: bool,
    promises: bool,
    tasks: bool,
    logs: VecDeque<String>,
    log_limit: usize,
}

impl Default for TraceState {
    fn default() -> Self {
        Self {
            enabled: false,
            promises: true,
            tasks: true,
            logs: VecDeque::new(),
            log_limit: 10_000,
        }
    }
}

impl TraceState {
    fn push(&mut self, line: String) {
        while self.logs.len() >= self.log_limit {
            self.logs.pop_front();
        }
        self.logs.push_back(line);
    }
}

/// State shared by every promise created from one [`PromiseRuntime`].
pub(crate) struct RuntimeShared {
    scheduler: Rc<dyn TaskScheduler>,
    next_promise_id: Cell<usize>,
    next_task_id: Cell<usize>,
    trace: RefCell<TraceState>,
}

impl RuntimeShared {
    pub(crate) fn allocate_promise_id(&self) -> usize {
        let id = self.next_promise_id.get();
        self.next_promise_id.set(id.saturating_add(1));
        id
    }

    /// Hands `task` to the scheduler, tagging it with `label` for the trace.
    pub(crate) fn submit(self: &Rc<Self>, label: String, task: Task) {
        let id = self.next_task_id.get();
        self.next_task_id.set(id.saturating_add(1));
        tracing::trace!(task = id, %label, "submit");
        self.trace_task_line(format!("[task] submit id={id} {label}"));

        let runtime = Rc::clone(self);
        self.scheduler.submit(Box::new(move || {
            tracing::trace!(task = id, %label, "run");
            runtime.trace_task_line(format!("[task] run id={id} {label}"));
            task();
        }));
    }

    pub(crate) fn trace_promise_line(&self, line: impl FnOnce() -> String) {
        let mut trace = self.trace.borrow_mut();
        if trace.enabled && trace.promises {
            trace.push(line());
        }
    }

    fn trace_task_line(&self, line: String) {
        let mut trace = self.trace.borrow_mut();
        if trace.enabled && trace.tasks {
            trace.push(line);
        }
    }
}

/// Factory for deferreds sharing one scheduler.
#[derive(Clone)]
pub struct PromiseRuntime {
    shared: Rc<RuntimeShared>,
}

impl fmt::Debug for PromiseRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromiseRuntime")
            .field("next_promise_id", &self.shared.next_promise_id.get())
            .field("trace", &self.shared.trace.borrow())
            .finish_non_exhaustive()
    }
}

impl PromiseRuntime {
    pub fn new(scheduler: Rc<dyn TaskScheduler>) -> Self {
        Self {
            shared: Rc::new(RuntimeShared {
                scheduler,
                next_promise_id: Cell::new(1),
                next_task_id: Cell::new(1),
                trace: RefCell::new(TraceState::default()),
            }),
        }
    }

    /// Convenience constructor wiring a fresh [`MicrotaskQueue`] in as the
    /// scheduler.
    pub fn with_microtask_queue() -> (Self, Rc<MicrotaskQueue>) {
        let queue = Rc::new(MicrotaskQueue::new());
        (Self::new(queue.clone()), queue)
    }

    pub fn defer(&self) -> Deferred {
        Deferred::from_core(PromiseCore::new(&self.shared))
    }

    pub fn enable_trace(&self, enabled: bool) {
        self.shared.trace.borrow_mut().enabled = enabled;
    }

    pub fn take_trace_logs(&self) -> Vec<String> {
        self.shared.trace.borrow_mut().logs.drain(..).collect()
    }

    pub fn set_trace_promises(&self, enabled: bool) {
        self.shared.trace.borrow_mut().promises = enabled;
    }

    pub fn set_trace_tasks(&self, enabled: bool) {
        self.shared.trace.borrow_mut().tasks = enabled;
    }

    pub fn set_trace_log_limit(&self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::Config(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        let mut trace = self.shared.trace.borrow_mut();
        trace.log_limit = max_entries;
        while trace.logs.len() > trace.log_limit {
            trace.logs.pop_front();
        }
        Ok(())
    }
}
