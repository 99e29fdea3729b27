/// A task pool for scoped fork/join parallelism.
///
/// On native targets, uses `std::thread::scope` for scoped parallel
/// execution: every task spawned inside a scope is joined before the
/// scope returns, so scratch buffers borrowed by tasks can never
/// outlive the barrier. On WASM, tasks execute sequentially on the
/// calling thread.
///
/// # Example
///
/// ```
/// use meshforge_core::compute::TaskPool;
///
/// let pool = TaskPool::new(4);
///
/// let mut results = vec![0u32; 4];
/// pool.scope(|s| {
///     for (i, slot) in results.iter_mut().enumerate() {
///         s.spawn(move || {
///             *slot = (i as u32) * 10;
///         });
///     }
/// });
/// assert_eq!(results, vec![0, 10, 20, 30]);
/// ```
pub struct TaskPool {
    #[allow(dead_code)]
    num_threads: usize,
}

impl TaskPool {
    /// Creates a new task pool with the given number of worker threads.
    ///
    /// On WASM, the thread count is ignored (single-threaded execution).
    pub fn new(num_threads: usize) -> Self {
        Self {
            num_threads: num_threads.max(1),
        }
    }

    /// Creates a task pool sized to the number of available CPU cores.
    pub fn default_threads() -> Self {
        Self::new(std::thread::available_parallelism().map_or(1, |n| n.get()))
    }

    /// Executes tasks within a scoped context.
    ///
    /// All tasks spawned within the closure complete before this method
    /// returns — the scope exit is the join barrier. Tasks can borrow
    /// local variables thanks to scoped lifetimes.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn scope<'env, F>(&self, f: F)
    where
        F: for<'scope> FnOnce(&Scope<'scope, 'env>),
    {
        std::thread::scope(|s| {
            let scope = Scope { inner: s };
            f(&scope);
        });
    }

    /// Executes tasks within a scoped context (WASM: sequential).
    #[cfg(target_arch = "wasm32")]
    pub fn scope<'env, F>(&self, f: F)
    where
        F: for<'scope> FnOnce(&Scope<'scope, 'env>),
    {
        let scope = Scope {
            _marker: std::marker::PhantomData,
        };
        f(&scope);
    }

    /// Runs `f` over every item in parallel and joins before returning.
    ///
    /// The parallel-for counterpart of [`scope`](Self::scope): each item
    /// becomes one task, and the implicit barrier at the end guarantees
    /// all of them finished.
    pub fn for_each<T, F>(&self, items: Vec<T>, f: F)
    where
        T: Send,
        F: Fn(T) + Sync,
    {
        self.scope(|s| {
            let f = &f;
            for item in items {
                s.spawn(move || f(item));
            }
        });
    }
}

impl Default for TaskPool {
    fn default() -> Self {
        Self::default_threads()
    }
}

/// A scope for spawning tasks that must complete before the scope exits.
#[cfg(not(target_arch = "wasm32"))]
pub struct Scope<'scope, 'env: 'scope> {
    inner: &'scope std::thread::Scope<'scope, 'env>,
}

#[cfg(not(target_arch = "wasm32"))]
impl<'scope, 'env> Scope<'scope, 'env> {
    /// Spawns a task within this scope.
    pub fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'scope,
    {
        self.inner.spawn(f);
    }
}

/// A scope for spawning tasks (WASM: sequential execution).
#[cfg(target_arch = "wasm32")]
pub struct Scope<'scope, 'env: 'scope> {
    _marker: std::marker::PhantomData<(&'scope (), &'env ())>,
}

#[cfg(target_arch = "wasm32")]
impl<'scope, 'env> Scope<'scope, 'env> {
    /// Spawns a task within this scope (WASM: executes immediately).
    pub fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'scope,
    {
        f();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn scope_runs_single_task() {
        let pool = TaskPool::new(2);
        let counter = AtomicU32::new(0);
        pool.scope(|s| {
            s.spawn(|| {
                counter.fetch_add(1, Ordering::Relaxed);
            });
        });
        assert_eq!(counter.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn scope_runs_multiple_tasks() {
        let pool = TaskPool::new(4);
        let counter = AtomicU32::new(0);
        pool.scope(|s| {
            for _ in 0..10 {
                s.spawn(|| {
                    counter.fetch_add(1, Ordering::Relaxed);
                });
            }
        });
        assert_eq!(counter.load(Ordering::Relaxed), 10);
    }

    #[test]
    fn scope_captures_references() {
        let pool = TaskPool::new(2);
        let mut value = 0u32;
        pool.scope(|s| {
            s.spawn(|| {
                value = 42;
            });
        });
        assert_eq!(value, 42);
    }

    #[test]
    fn for_each_visits_all_items() {
        let pool = TaskPool::new(4);
        let mut values = vec![1u32, 2, 3, 4, 5];
        let slots: Vec<&mut u32> = values.iter_mut().collect();
        pool.for_each(slots, |slot| {
            *slot *= 2;
        });
        assert_eq!(values, vec![2, 4, 6, 8, 10]);
    }

    #[test]
    fn default_threads_at_least_one() {
        let pool = TaskPool::default_threads();
        assert!(pool.num_threads >= 1);
    }
}
