// In-Memory QueueTransport Implementation

use kestrel_net_core::port::{QueueTransport, TransportError};
use std::collections::{HashMap, VecDeque};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

struct Item {
    payload: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Item {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Process-local queues with blocking `get`
///
/// Queues are created on first `put` or `get`, like on a Kestrel server.
/// Useful for tests and for workers embedded in the same process.
#[derive(Default)]
pub struct MemoryTransport {
    queues: Mutex<HashMap<String, VecDeque<Item>>>,
    available: Condvar,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live items waiting on `queue`
    pub fn len(&self, queue: &str) -> Result<usize, TransportError> {
        let now = Instant::now();
        let queues = self.lock()?;
        Ok(queues
            .get(queue)
            .map_or(0, |items| items.iter().filter(|i| !i.is_expired(now)).count()))
    }

    pub fn contains_queue(&self, queue: &str) -> Result<bool, TransportError> {
        Ok(self.lock()?.contains_key(queue))
    }

    /// Sorted names of every known queue
    pub fn queue_names(&self) -> Result<Vec<String>, TransportError> {
        let mut names: Vec<String> = self.lock()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, VecDeque<Item>>>, TransportError> {
        self.queues.lock().map_err(poisoned)
    }
}

fn poisoned<T>(_: T) -> TransportError {
    TransportError::Unavailable("memory transport lock poisoned".to_string())
}

impl QueueTransport for MemoryTransport {
    fn put(
        &self,
        queue: &str,
        payload: &[u8],
        expiration: Option<Duration>,
    ) -> Result<bool, TransportError> {
        let item = Item {
            payload: payload.to_vec(),
            expires_at: expiration.map(|ttl| Instant::now() + ttl),
        };
        self.lock()?
            .entry(queue.to_string())
            .or_default()
            .push_back(item);
        self.available.notify_all();
        Ok(true)
    }

    fn get(&self, queue: &str, timeout: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        let deadline = Instant::now() + timeout;
        let mut queues = self.lock()?;

        loop {
            let now = Instant::now();
            let items = queues.entry(queue.to_string()).or_default();
            while let Some(item) = items.pop_front() {
                if !item.is_expired(now) {
                    return Ok(Some(item.payload));
                }
            }

            if now >= deadline {
                return Ok(None);
            }
            let (guard, _) = self
                .available
                .wait_timeout(queues, deadline - now)
                .map_err(poisoned)?;
            queues = guard;
        }
    }

    fn confirm(&self, _queue: &str) -> Result<bool, TransportError> {
        Ok(true)
    }

    fn delete(&self, queue: &str) -> Result<bool, TransportError> {
        Ok(self.lock()?.remove(queue).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fifo_order() {
        let transport = MemoryTransport::new();
        transport.put("q", b"1", None).unwrap();
        transport.put("q", b"2", None).unwrap();

        let timeout = Duration::from_millis(10);
        assert_eq!(transport.get("q", timeout).unwrap(), Some(b"1".to_vec()));
        assert_eq!(transport.get("q", timeout).unwrap(), Some(b"2".to_vec()));
        assert_eq!(transport.get("q", timeout).unwrap(), None);
    }

    #[test]
    fn test_get_times_out_on_empty_queue() {
        let transport = MemoryTransport::new();
        let start = Instant::now();

        assert!(transport.get("empty", Duration::from_millis(50)).unwrap().is_none());
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert!(transport.contains_queue("empty").unwrap());
    }

    #[test]
    fn test_get_wakes_on_put() {
        let transport = Arc::new(MemoryTransport::new());
        let producer = Arc::clone(&transport);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.put("q", b"late", None).unwrap();
        });

        let item = transport.get("q", Duration::from_secs(5)).unwrap();
        assert_eq!(item, Some(b"late".to_vec()));
        handle.join().unwrap();
    }

    #[test]
    fn test_expired_items_are_skipped() {
        let transport = MemoryTransport::new();
        transport.put("q", b"old", Some(Duration::ZERO)).unwrap();
        transport.put("q", b"fresh", None).unwrap();

        assert_eq!(transport.len("q").unwrap(), 1);
        assert_eq!(
            transport.get("q", Duration::from_millis(10)).unwrap(),
            Some(b"fresh".to_vec())
        );
    }

    #[test]
    fn test_delete_removes_queue() {
        let transport = MemoryTransport::new();
        transport.put("q", b"x", None).unwrap();

        assert!(transport.delete("q").unwrap());
        assert!(!transport.delete("q").unwrap());
        assert!(transport.queue_names().unwrap().is_empty());
    }

    #[test]
    fn test_poisoned_lock_is_reported_by_every_accessor() {
        let transport = Arc::new(MemoryTransport::new());
        let holder = Arc::clone(&transport);
        let _ = thread::spawn(move || {
            let _guard = holder.queues.lock().unwrap();
            panic!("poison the queue map");
        })
        .join();

        assert!(matches!(transport.len("q"), Err(TransportError::Unavailable(_))));
        assert!(matches!(
            transport.contains_queue("q"),
            Err(TransportError::Unavailable(_))
        ));
        assert!(matches!(
            transport.queue_names(),
            Err(TransportError::Unavailable(_))
        ));
        assert!(matches!(
            transport.put("q", b"x", None),
            Err(TransportError::Unavailable(_))
        ));
    }
}
