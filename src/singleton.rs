//! Sharded singleton cache with single-flight creation.
//!
//! Names hash to one of a fixed number of shards, each behind its own lock.
//! The shard lock only guards bookkeeping and is never held while a bean is
//! being built, so unrelated singletons are created in parallel.
//!
//! The first caller for an uncached name registers a *flight* and runs the
//! factory. Later callers for that name find the flight and block on it until
//! the owner publishes either the instance or the error. A failed flight
//! leaves nothing behind, so the next request starts a fresh one.
//!
//! Every blocked caller records the flight it waits on. Before blocking, a
//! caller follows owner -> awaited flight -> owner links; if the chain comes
//! back to itself, waiting would never end and the request fails with
//! [`IocError::CurrentlyInCreation`] instead.

use std::collections::HashMap;
#[cfg(not(feature = "ahash"))]
use std::hash::BuildHasher;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::{AnyArc, IocError, IocResult};

/// Number of shards when none is configured.
pub const DEFAULT_SHARD_COUNT: usize = 64;

#[cfg(feature = "ahash")]
type NameMap<V> = ahash::AHashMap<String, V>;
#[cfg(not(feature = "ahash"))]
type NameMap<V> = std::collections::HashMap<String, V>;

#[cfg(feature = "ahash")]
type ShardHasher = ahash::RandomState;
#[cfg(not(feature = "ahash"))]
type ShardHasher = std::collections::hash_map::RandomState;

/// Process-wide store of fully built singleton instances.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{AnyArc, SingletonCache};
/// use std::sync::Arc;
///
/// let cache = SingletonCache::new();
/// assert!(cache.get("logger").is_none());
///
/// let first = cache.get_or_create("logger", || Ok(Arc::new("stdout".to_string()) as AnyArc)).unwrap();
/// let second = cache.get_or_create("logger", || unreachable!()).unwrap();
///
/// assert!(Arc::ptr_eq(&first, &second));
/// assert_eq!(cache.len(), 1);
/// ```
pub struct SingletonCache {
    shards: Box<[Mutex<Shard>]>,
    hasher: ShardHasher,
    // Blocked thread -> flight it is waiting on
    waiting: Mutex<HashMap<ThreadId, Arc<Flight>>>,
}

#[derive(Default)]
struct Shard {
    ready: NameMap<AnyArc>,
    in_flight: NameMap<Arc<Flight>>,
}

/// One in-progress creation, shared by its owner and every waiter.
struct Flight {
    owner: ThreadId,
    state: Mutex<FlightState>,
    done: Condvar,
}

enum FlightState {
    Pending,
    Finished(IocResult<AnyArc>),
}

impl Flight {
    fn new() -> Self {
        Self {
            owner: thread::current().id(),
            state: Mutex::new(FlightState::Pending),
            done: Condvar::new(),
        }
    }

    fn publish(&self, result: IocResult<AnyArc>) {
        *self.state.lock() = FlightState::Finished(result);
        self.done.notify_all();
    }

    fn is_pending(&self) -> bool {
        matches!(*self.state.lock(), FlightState::Pending)
    }

    fn wait(&self) -> IocResult<AnyArc> {
        let mut state = self.state.lock();
        loop {
            if let FlightState::Finished(result) = &*state {
                return result.clone();
            }
            self.done.wait(&mut state);
        }
    }
}

impl SingletonCache {
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARD_COUNT)
    }

    /// Cache with `count` shards, rounded up to a power of two.
    pub fn with_shards(count: usize) -> Self {
        let count = count.max(1).next_power_of_two();
        Self {
            shards: (0..count).map(|_| Mutex::new(Shard::default())).collect(),
            hasher: ShardHasher::default(),
            waiting: Mutex::new(HashMap::new()),
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    #[inline]
    fn shard(&self, name: &str) -> &Mutex<Shard> {
        let index = (self.hasher.hash_one(name) as usize) & (self.shards.len() - 1);
        &self.shards[index]
    }

    /// Cached instance for `name`; never triggers creation.
    pub fn get(&self, name: &str) -> Option<AnyArc> {
        self.shard(name).lock().ready.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.shard(name).lock().ready.contains_key(name)
    }

    /// Whether some thread is currently building `name`.
    pub fn is_currently_in_creation(&self, name: &str) -> bool {
        self.shard(name).lock().in_flight.contains_key(name)
    }

    /// Returns the instance for `name`, running `factory` at most once across
    /// all concurrent callers.
    ///
    /// Callers that arrive while another thread is building `name` block
    /// until that build completes and receive its outcome, success or error.
    /// If the thread that is building `name` asks for it again, or waiting
    /// would close a cycle of threads blocked on each other's builds, the
    /// call fails with [`IocError::CurrentlyInCreation`] instead of
    /// deadlocking.
    /// A factory that panics leaves no entry; waiters receive
    /// [`IocError::CreationPanicked`].
    pub fn get_or_create<F>(&self, name: &str, factory: F) -> IocResult<AnyArc>
    where
        F: FnOnce() -> IocResult<AnyArc>,
    {
        let flight = {
            let mut shard = self.shard(name).lock();
            if let Some(instance) = shard.ready.get(name) {
                return Ok(instance.clone());
            }
            if let Some(flight) = shard.in_flight.get(name) {
                let flight = flight.clone();
                drop(shard);
                if flight.owner == thread::current().id() {
                    return Err(IocError::CurrentlyInCreation(name.to_string()));
                }
                return self.await_flight(name, flight);
            }
            let flight = Arc::new(Flight::new());
            shard.in_flight.insert(name.to_string(), flight.clone());
            flight
        };

        debug!(bean = name, "creating singleton instance");
        let mut landing = Landing {
            cache: self,
            name,
            flight,
            landed: false,
        };
        let result = factory();
        landing.land(result.clone());
        result
    }

    fn await_flight(&self, name: &str, flight: Arc<Flight>) -> IocResult<AnyArc> {
        let me = thread::current().id();
        {
            let mut waiting = self.waiting.lock();
            let mut owner = flight.owner;
            // A finished flight's waiter is about to wake, so the chain ends there
            while let Some(next) = waiting.get(&owner).filter(|next| next.is_pending()) {
                owner = next.owner;
                if owner == me {
                    debug!(bean = name, "singleton creation deadlock across threads");
                    return Err(IocError::CurrentlyInCreation(name.to_string()));
                }
            }
            waiting.insert(me, flight.clone());
        }
        let _waiting = Waiting { cache: self, thread: me };

        trace!(bean = name, "waiting for in-flight singleton");
        flight.wait()
    }

    /// Registers an externally built instance under `name`.
    pub fn register_singleton(&self, name: &str, instance: AnyArc) -> IocResult<()> {
        let mut shard = self.shard(name).lock();
        if shard.ready.contains_key(name) || shard.in_flight.contains_key(name) {
            return Err(IocError::SingletonAlreadyExists(name.to_string()));
        }
        shard.ready.insert(name.to_string(), instance);
        debug!(bean = name, "registered singleton instance");
        Ok(())
    }

    /// Number of cached singletons.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().ready.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of cached singletons, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .shards
            .iter()
            .flat_map(|shard| shard.lock().ready.keys().cloned().collect::<Vec<_>>())
            .collect();
        names.sort();
        names
    }
}

impl Default for SingletonCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Completes a flight exactly once, including when the factory unwinds.
struct Landing<'a> {
    cache: &'a SingletonCache,
    name: &'a str,
    flight: Arc<Flight>,
    landed: bool,
}

impl Landing<'_> {
    fn land(&mut self, result: IocResult<AnyArc>) {
        self.landed = true;
        {
            let mut shard = self.cache.shard(self.name).lock();
            shard.in_flight.remove(self.name);
            if let Ok(instance) = &result {
                shard.ready.insert(self.name.to_string(), instance.clone());
            }
        }
        if result.is_err() {
            debug!(bean = self.name, "singleton creation failed; nothing cached");
        }
        self.flight.publish(result);
    }
}

impl Drop for Landing<'_> {
    fn drop(&mut self) {
        if !self.landed {
            self.land(Err(IocError::CreationPanicked(self.name.to_string())));
        }
    }
}

/// Clears the waiting record of a thread once its wait ends.
struct Waiting<'a> {
    cache: &'a SingletonCache,
    thread: ThreadId,
}

impl Drop for Waiting<'_> {
    fn drop(&mut self) {
        self.cache.waiting.lock().remove(&self.thread);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Barrier;
    use std::time::Duration;

    fn boxed<T: Send + Sync + 'static>(value: T) -> AnyArc {
        Arc::new(value)
    }

    #[test]
    fn concurrent_callers_share_one_build() {
        let cache = SingletonCache::new();
        let calls = AtomicU32::new(0);
        let barrier = Barrier::new(8);

        let values: Vec<AnyArc> = thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        cache
                            .get_or_create("db", || {
                                calls.fetch_add(1, Ordering::SeqCst);
                                thread::sleep(Duration::from_millis(20));
                                Ok(boxed(42u32))
                            })
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for value in &values[1..] {
            assert!(Arc::ptr_eq(&values[0], value));
        }
    }

    #[test]
    fn failure_is_not_cached() {
        let cache = SingletonCache::new();
        let err = cache
            .get_or_create("db", || Err(IocError::NoSuchDefinition("dep".into())))
            .unwrap_err();
        assert!(matches!(err, IocError::NoSuchDefinition(_)));
        assert!(cache.get("db").is_none());
        assert!(!cache.is_currently_in_creation("db"));

        let value = cache.get_or_create("db", || Ok(boxed(1u8))).unwrap();
        assert_eq!(*value.downcast::<u8>().unwrap(), 1);
    }

    #[test]
    fn waiters_observe_the_failure() {
        let cache = SingletonCache::new();
        let started = Barrier::new(2);
        let calls = AtomicU32::new(0);

        let (owner, waiter) = thread::scope(|s| {
            let owner = s.spawn(|| {
                cache.get_or_create("flaky", || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    started.wait();
                    thread::sleep(Duration::from_millis(50));
                    Err(IocError::CircularPrototype("flaky".into()))
                })
            });
            started.wait();
            let waiter = s.spawn(|| {
                cache.get_or_create("flaky", || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(boxed(()))
                })
            });
            (owner.join().unwrap(), waiter.join().unwrap())
        });

        assert!(owner.is_err());
        assert!(waiter.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reentrant_creation_on_owner_thread_fails_fast() {
        let cache = SingletonCache::new();
        let result = cache.get_or_create("self", || {
            let inner = cache.get_or_create("self", || Ok(boxed(0u8)));
            assert!(matches!(inner, Err(IocError::CurrentlyInCreation(ref n)) if n == "self"));
            Ok(boxed(1u8))
        });
        assert!(result.is_ok());
    }

    #[test]
    fn crossed_builds_on_two_threads_fail_instead_of_hanging() {
        let cache = SingletonCache::new();
        let both_inside = Barrier::new(2);

        let (left, right) = thread::scope(|s| {
            let build = |own: &'static str, other: &'static str| {
                let cache = &cache;
                let both_inside = &both_inside;
                move || {
                    cache.get_or_create(own, || {
                        both_inside.wait();
                        cache.get_or_create(other, || Ok(boxed(0u8)))?;
                        Ok(boxed(own))
                    })
                }
            };
            let left = s.spawn(build("a", "b"));
            let right = s.spawn(build("b", "a"));
            (left.join().unwrap(), right.join().unwrap())
        });

        // One side detects the cycle; the other receives that failure
        assert!(matches!(left, Err(IocError::CurrentlyInCreation(_))));
        assert!(matches!(right, Err(IocError::CurrentlyInCreation(_))));
        assert!(cache.is_empty());
        assert!(cache.waiting.lock().is_empty());
    }

    #[test]
    fn panicking_factory_leaves_no_entry() {
        let cache = SingletonCache::new();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let _ = cache.get_or_create("boom", || panic!("factory exploded"));
        }));
        assert!(outcome.is_err());
        assert!(!cache.contains("boom"));
        assert!(!cache.is_currently_in_creation("boom"));
        assert!(cache.get_or_create("boom", || Ok(boxed(3u8))).is_ok());
    }

    #[test]
    fn register_rejects_duplicates() {
        let cache = SingletonCache::with_shards(3);
        assert_eq!(cache.shard_count(), 4);
        cache.register_singleton("config", boxed("prod")).unwrap();
        let err = cache.register_singleton("config", boxed("dev")).unwrap_err();
        assert!(matches!(err, IocError::SingletonAlreadyExists(_)));
        assert_eq!(cache.names(), vec!["config".to_string()]);
    }

    #[test]
    fn different_names_build_in_parallel() {
        let cache = SingletonCache::new();
        let both_inside = Barrier::new(2);

        // Each factory waits for the other to start; a global lock would deadlock here.
        thread::scope(|s| {
            for name in ["left", "right"] {
                let cache = &cache;
                let both_inside = &both_inside;
                s.spawn(move || {
                    cache
                        .get_or_create(name, || {
                            both_inside.wait();
                            Ok(boxed(name.to_string()))
                        })
                        .unwrap()
                });
            }
        });

        assert_eq!(cache.len(), 2);
    }
}
