use super::*;

pub type Task = Box<dyn FnOnce()>;

const DEFAULT_STEP_LIMIT: usize = 10_000;

/// Deferred-callback seam ("nextTick").
///
/// Implementations must run submitted tasks later, in submission order, and
/// never from inside `submit` itself.
pub trait TaskScheduler {
    fn submit(&self, task: Task);
}

impl<F> TaskScheduler for F
where
    F: Fn(Task),
{
    fn submit(&self, task: Task) {
        self(task)
    }
}

/// FIFO microtask queue driven explicitly by the host.
pub struct MicrotaskQueue {
    queue: RefCell<VecDeque<Task>>,
    step_limit: Cell<usize>,
    depth: Cell<usize>,
}

impl Default for MicrotaskQueue {
    fn default() -> Self {
        Self {
            queue: RefCell::new(VecDeque::new()),
            step_limit: Cell::new(DEFAULT_STEP_LIMIT),
            depth: Cell::new(0),
        }
    }
}

impl fmt::Debug for MicrotaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MicrotaskQueue")
            .field("queued", &self.len())
            .field("step_limit", &self.step_limit.get())
            .field("depth", &self.depth.get())
            .finish()
    }
}

impl MicrotaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    pub fn step_limit(&self) -> usize {
        self.step_limit.get()
    }

    pub fn set_step_limit(&self, max_steps: usize) -> Result<()> {
        if max_steps == 0 {
            return Err(Error::Config(
                "set_step_limit requires at least 1 step".into(),
            ));
        }
        self.step_limit.set(max_steps);
        Ok(())
    }

    /// Runs the oldest queued task. Returns `false` when nothing was queued.
    pub fn run_next(&self) -> bool {
        let Some(task) = self.queue.borrow_mut().pop_front() else {
            return false;
        };
        self.with_depth(task);
        true
    }

    /// Drains the queue, including tasks submitted while draining, and
    /// returns how many ran. A drain requested from inside a running task is
    /// a no-op; the outer drain picks the new work up.
    pub fn run_until_idle(&self) -> Result<usize> {
        if self.depth.get() > 0 {
            return Ok(0);
        }
        let limit = self.step_limit.get();
        let mut steps = 0usize;
        loop {
            if self.is_empty() {
                return Ok(steps);
            }
            if steps >= limit {
                tracing::warn!(limit, remaining = self.len(), "microtask step limit exceeded");
                return Err(Error::StepLimitExceeded {
                    limit,
                    steps: steps + 1,
                });
            }
            steps += 1;
            self.run_next();
        }
    }

    fn with_depth(&self, task: Task) {
        self.depth.set(self.depth.get() + 1);
        let run_result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(task));
        self.depth.set(self.depth.get().saturating_sub(1));
        if let Err(payload) = run_result {
            std::panic::resume_unwind(payload);
        }
    }
}

impl TaskScheduler for MicrotaskQueue {
    fn submit(&self, task: Task) {
        self.queue.borrow_mut().push_back(task);
    }
}
