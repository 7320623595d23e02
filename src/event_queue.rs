//! A bounded, thread-safe FIFO of pending work shared between producer threads and the flush
//! worker.
use std::collections::VecDeque;
use std::sync::Mutex;

/// A bounded, ordered, thread-safe container. Each operation is atomic with respect to the
/// others: no caller can observe a partial mutation.
///
/// Capacity is advisory: [`add`](EventQueue::add) silently drops the element when the queue is
/// full instead of returning an error. The processor checks [`size`](EventQueue::size) and
/// flushes before capacity is exceeded, so in steady state the drop path is only hit while a
/// flush is failing.
pub trait EventQueue<T>: Send + Sync {
    /// Appends to the tail. No-op if the queue is at capacity.
    fn add(&self, item: T);

    /// Returns up to `count` elements from the head without removing them.
    fn get(&self, count: usize) -> Vec<T>;

    /// Removes and returns up to `count` elements from the head, preserving order.
    fn remove(&self, count: usize) -> Vec<T>;

    /// Current number of queued elements.
    fn size(&self) -> usize;
}

/// Default in-memory [`EventQueue`] implementation.
pub struct InMemoryQueue<T> {
    max_size: usize,
    items: Mutex<VecDeque<T>>,
}

impl<T> InMemoryQueue<T> {
    /// Create an empty queue holding at most `max_size` elements.
    pub fn new(max_size: usize) -> InMemoryQueue<T> {
        InMemoryQueue {
            max_size,
            items: Mutex::new(VecDeque::with_capacity(max_size)),
        }
    }
}

impl<T: Clone + Send> EventQueue<T> for InMemoryQueue<T> {
    fn add(&self, item: T) {
        let mut items = self
            .items
            .lock()
            .expect("thread holding queue lock should not panic");
        if items.len() < self.max_size {
            items.push_back(item);
        }
    }

    fn get(&self, count: usize) -> Vec<T> {
        let items = self
            .items
            .lock()
            .expect("thread holding queue lock should not panic");
        items.iter().take(count).cloned().collect()
    }

    fn remove(&self, count: usize) -> Vec<T> {
        let mut items = self
            .items
            .lock()
            .expect("thread holding queue lock should not panic");
        let count = count.min(items.len());
        items.drain(..count).collect()
    }

    fn size(&self) -> usize {
        let items = self
            .items
            .lock()
            .expect("thread holding queue lock should not panic");
        items.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn add_and_size() {
        let queue = InMemoryQueue::new(10);
        assert_eq!(queue.size(), 0);
        queue.add(1);
        queue.add(2);
        assert_eq!(queue.size(), 2);
    }

    #[test]
    fn get_peeks_without_removing() {
        let queue = InMemoryQueue::new(10);
        queue.add("a");
        queue.add("b");
        queue.add("c");

        assert_eq!(queue.get(2), vec!["a", "b"]);
        assert_eq!(queue.size(), 3);
        // Peeking more than available returns what's there.
        assert_eq!(queue.get(10), vec!["a", "b", "c"]);
    }

    #[test]
    fn remove_pops_from_the_head_in_order() {
        let queue = InMemoryQueue::new(10);
        queue.add(1);
        queue.add(2);
        queue.add(3);

        assert_eq!(queue.remove(2), vec![1, 2]);
        assert_eq!(queue.size(), 1);
        assert_eq!(queue.remove(10), vec![3]);
        assert_eq!(queue.size(), 0);
    }

    #[test]
    fn add_is_a_no_op_at_capacity() {
        let queue = InMemoryQueue::new(2);
        queue.add(1);
        queue.add(2);
        queue.add(3);

        assert_eq!(queue.size(), 2);
        assert_eq!(queue.get(10), vec![1, 2]);
    }

    #[test]
    fn can_add_from_another_thread() {
        let queue = Arc::new(InMemoryQueue::new(10));

        {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || queue.add(7))
                .join()
                .expect("queue writer thread should not panic");
        }

        assert_eq!(queue.remove(1), vec![7]);
    }
}
