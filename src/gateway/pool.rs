//! Bounded worker pool with immediate rejection.
//!
//! Admission, in order:
//! 1. an idle worker not yet claimed by a queued task takes the task
//! 2. otherwise a new worker is spawned while below `max_workers`
//! 3. otherwise the task waits in the queue while below `queue_capacity`
//! 4. otherwise `PoolError::Busy`
//!
//! So at most `max_workers + queue_capacity` tasks exist at once. Workers
//! idle for longer than `keep_alive` retire down to `min_workers`.

use crate::utils::config::{DEFAULT_KEEP_ALIVE, DEFAULT_MIN_WORKERS, DEFAULT_QUEUE_CAPACITY};
use crate::utils::error::PoolError;
use log::{debug, warn};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Pool sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub min_workers: usize,
    pub max_workers: usize,
    pub queue_capacity: usize,
    pub keep_alive: Duration,
}

impl PoolConfig {
    pub fn new(max_workers: usize) -> Self {
        Self {
            min_workers: DEFAULT_MIN_WORKERS.min(max_workers),
            max_workers,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            keep_alive: DEFAULT_KEEP_ALIVE,
        }
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn with_min_workers(mut self, min_workers: usize) -> Self {
        self.min_workers = min_workers;
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Most tasks that can be running or queued at once
    pub fn capacity(&self) -> usize {
        self.max_workers + self.queue_capacity
    }

    fn validate(&self) -> Result<(), PoolError> {
        if self.max_workers == 0 {
            return Err(PoolError::InvalidConfig(
                "max_workers must be greater than 0".to_string(),
            ));
        }
        if self.keep_alive.is_zero() {
            return Err(PoolError::InvalidConfig(
                "keep_alive must be greater than 0".to_string(),
            ));
        }
        if self.min_workers > self.max_workers {
            return Err(PoolError::InvalidConfig(format!(
                "min_workers ({}) cannot exceed max_workers ({})",
                self.min_workers, self.max_workers
            )));
        }
        Ok(())
    }
}

#[derive(Default)]
struct State {
    queue: VecDeque<Task>,
    workers: usize,
    idle: usize,
    shutdown: bool,
}

struct Shared {
    state: Mutex<State>,
    available: Condvar,
    config: PoolConfig,
}

/// Fixed-capacity pool running blocking tasks on worker threads
pub struct WorkerPool {
    shared: Arc<Shared>,
}

impl WorkerPool {
    /// Create a pool; no threads start until the first task arrives
    ///
    /// # Errors
    /// * `PoolError::InvalidConfig` - zero workers or min above max
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                available: Condvar::new(),
                config,
            }),
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// Hand a task to the pool without waiting for it
    ///
    /// # Errors
    /// * `PoolError::Busy` - no free worker and the queue is full
    /// * `PoolError::ShutDown` - pool is shutting down
    /// * `PoolError::SpawnFailed` - a needed worker thread could not start
    pub fn submit(&self, task: Task) -> Result<(), PoolError> {
        let config = &self.shared.config;
        let mut state = self.shared.state.lock();

        if state.shutdown {
            return Err(PoolError::ShutDown);
        }

        if state.idle > state.queue.len() {
            state.queue.push_back(task);
            drop(state);
            self.shared.available.notify_one();
            return Ok(());
        }

        if state.workers < config.max_workers {
            state.workers += 1;
            let worker_no = state.workers;
            drop(state);
            return self.spawn_worker(worker_no, task);
        }

        if state.queue.len() < config.queue_capacity {
            state.queue.push_back(task);
            drop(state);
            self.shared.available.notify_one();
            return Ok(());
        }

        Err(PoolError::Busy)
    }

    /// Run `f` on the pool and block until it returns
    ///
    /// **Public** - synchronous facade used by the parse gateway
    ///
    /// # Errors
    /// * Any admission error from `submit`
    /// * `PoolError::TaskPanicked` - `f` panicked on the worker
    pub fn execute<T, F>(&self, f: F) -> Result<T, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(1);
        self.submit(Box::new(move || {
            // Receiver only goes away if the caller gave up
            let _ = tx.send(f());
        }))?;
        rx.recv().map_err(|_| PoolError::TaskPanicked)
    }

    /// Tasks running or waiting
    pub fn in_flight(&self) -> usize {
        let state = self.shared.state.lock();
        state.queue.len() + (state.workers - state.idle)
    }

    /// Live worker threads
    pub fn worker_count(&self) -> usize {
        self.shared.state.lock().workers
    }

    pub fn queued(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    fn spawn_worker(&self, worker_no: usize, first: Task) -> Result<(), PoolError> {
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("jfr-parser-{}", worker_no))
            .spawn(move || worker_loop(shared, first));

        if let Err(e) = spawned {
            self.shared.state.lock().workers -= 1;
            return Err(PoolError::SpawnFailed(e));
        }
        debug!("Spawned parse worker {}", worker_no);
        Ok(())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shared.state.lock().shutdown = true;
        self.shared.available.notify_all();
    }
}

fn worker_loop(shared: Arc<Shared>, first: Task) {
    let config = shared.config;
    let mut next = Some(first);

    while let Some(task) = next.take() {
        run_task(task);

        let mut state = shared.state.lock();
        state.idle += 1;
        next = loop {
            if let Some(task) = state.queue.pop_front() {
                break Some(task);
            }
            if state.shutdown {
                break None;
            }
            // Workers at the minimum never retire, so they wait untimed
            if state.workers <= config.min_workers {
                shared.available.wait(&mut state);
                continue;
            }
            let timed_out = shared
                .available
                .wait_for(&mut state, config.keep_alive)
                .timed_out();
            if timed_out && state.queue.is_empty() && state.workers > config.min_workers {
                break None;
            }
        };
        state.idle -= 1;

        if next.is_none() {
            state.workers -= 1;
            debug!("Parse worker retired, {} remaining", state.workers);
        }
    }
}

fn run_task(task: Task) {
    if catch_unwind(AssertUnwindSafe(task)).is_err() {
        warn!("Parse task panicked; worker continues");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    /// Blocks tasks until opened
    #[derive(Clone, Default)]
    struct Gate(Arc<(Mutex<bool>, Condvar)>);

    impl Gate {
        fn wait(&self) {
            let (open, cvar) = &*self.0;
            let mut open = open.lock();
            while !*open {
                cvar.wait(&mut open);
            }
        }

        fn open(&self) {
            let (open, cvar) = &*self.0;
            *open.lock() = true;
            cvar.notify_all();
        }
    }

    fn wait_until(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_execute_returns_value() {
        let pool = WorkerPool::new(PoolConfig::new(2)).unwrap();
        assert_eq!(pool.execute(|| 40 + 2).unwrap(), 42);
        assert_eq!(pool.worker_count(), 1);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            WorkerPool::new(PoolConfig::new(0)),
            Err(PoolError::InvalidConfig(_))
        ));
        assert!(matches!(
            WorkerPool::new(PoolConfig::new(1).with_min_workers(2)),
            Err(PoolError::InvalidConfig(_))
        ));
        assert!(matches!(
            WorkerPool::new(PoolConfig::new(2).with_keep_alive(Duration::ZERO)),
            Err(PoolError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_beyond_capacity() {
        let pool = Arc::new(WorkerPool::new(PoolConfig::new(2).with_queue_capacity(1)).unwrap());
        let gate = Gate::default();

        let handles: Vec<_> = (0..3)
            .map(|i| {
                let pool = Arc::clone(&pool);
                let gate = gate.clone();
                thread::spawn(move || pool.execute(move || {
                    gate.wait();
                    i
                }))
            })
            .collect();

        wait_until(|| pool.in_flight() == 3);
        assert_eq!(pool.queued(), 1);
        assert!(matches!(pool.execute(|| 0), Err(PoolError::Busy)));

        gate.open();
        let mut results: Vec<i32> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect();
        results.sort();
        assert_eq!(results, vec![0, 1, 2]);
    }

    #[test]
    fn test_panicking_task_does_not_kill_pool() {
        let pool = WorkerPool::new(PoolConfig::new(1)).unwrap();
        let result: Result<(), _> = pool.execute(|| panic!("boom"));
        assert!(matches!(result, Err(PoolError::TaskPanicked)));
        assert_eq!(pool.execute(|| "still alive").unwrap(), "still alive");
        assert_eq!(pool.worker_count(), 1);
    }

    #[test]
    fn test_worker_at_minimum_outlives_keep_alive() {
        let config = PoolConfig::new(2)
            .with_min_workers(1)
            .with_keep_alive(Duration::from_millis(10));
        let pool = WorkerPool::new(config).unwrap();

        assert_eq!(pool.execute(|| 1).unwrap(), 1);
        thread::sleep(Duration::from_millis(60));

        assert_eq!(pool.worker_count(), 1);
        assert_eq!(pool.execute(|| 2).unwrap(), 2);
        assert_eq!(pool.worker_count(), 1);
    }

    #[test]
    fn test_idle_workers_retire_to_minimum() {
        let config = PoolConfig::new(3)
            .with_min_workers(1)
            .with_keep_alive(Duration::from_millis(20));
        let pool = Arc::new(WorkerPool::new(config).unwrap());
        let gate = Gate::default();

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let pool = Arc::clone(&pool);
                let gate = gate.clone();
                thread::spawn(move || pool.execute(move || gate.wait()))
            })
            .collect();

        wait_until(|| pool.worker_count() == 3);
        gate.open();
        for h in handles {
            h.join().unwrap().unwrap();
        }

        wait_until(|| pool.worker_count() == 1);
        assert_eq!(pool.in_flight(), 0);
    }
}
