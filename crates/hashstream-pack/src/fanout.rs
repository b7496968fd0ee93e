use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_stream::stream;
use futures::stream::BoxStream;
use tokio::sync::Notify;

/// Multi-cursor broadcast buffer.
///
/// One producer pushes items into a shared queue; any number of
/// subscribers read it independently, each at its own pace. Subscribers
/// wait on a [`Notify`] that fires on every push and on close.
///
/// An item is released once every live subscriber has read it. While no
/// subscriber exists nothing is released, so a buffer filled before its
/// first subscriber holds everything pushed so far.
pub struct Fanout<T> {
    inner: Arc<Shared<T>>,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    notify: Notify,
}

struct State<T> {
    items: VecDeque<T>,
    /// Absolute position of `items[0]`.
    base: usize,
    /// Absolute read position of every live subscriber.
    cursors: HashMap<u64, usize>,
    next_id: u64,
    peak: usize,
    closed: bool,
}

enum Next<T> {
    Item(T),
    Pending,
    Done,
}

impl<T> State<T> {
    fn pushed(&self) -> usize {
        self.base + self.items.len()
    }

    fn release(&mut self) {
        if let Some(&slowest) = self.cursors.values().min() {
            while self.base < slowest && self.items.pop_front().is_some() {
                self.base += 1;
            }
        }
    }
}

impl<T: Clone + Send + 'static> Fanout<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Shared {
                state: Mutex::new(State {
                    items: VecDeque::new(),
                    base: 0,
                    cursors: HashMap::new(),
                    next_id: 0,
                    peak: 0,
                    closed: false,
                }),
                notify: Notify::new(),
            }),
        }
    }

    /// Append an item and wake every waiting subscriber. Pushing after
    /// [`close`](Self::close) is ignored.
    pub fn push(&self, item: T) {
        {
            let mut state = self.inner.state.lock().expect("fanout lock poisoned");
            if state.closed {
                return;
            }
            state.items.push_back(item);
            state.peak = state.peak.max(state.items.len());
        }
        self.inner.notify.notify_waiters();
    }

    /// Mark the end of input. Subscribers finish after draining the buffer.
    pub fn close(&self) {
        self.inner.state.lock().expect("fanout lock poisoned").closed = true;
        self.inner.notify.notify_waiters();
    }

    /// Number of items pushed so far.
    pub fn pushed(&self) -> usize {
        self.inner.state.lock().expect("fanout lock poisoned").pushed()
    }

    /// Number of items currently held in memory.
    pub fn retained(&self) -> usize {
        self.inner.state.lock().expect("fanout lock poisoned").items.len()
    }

    /// Largest [`retained`](Self::retained) count seen so far.
    pub fn peak_retained(&self) -> usize {
        self.inner.state.lock().expect("fanout lock poisoned").peak
    }

    /// A new cursor starting at the oldest retained item.
    ///
    /// The cursor is registered immediately, so items pushed after this
    /// call are held until the returned stream reads or drops them.
    pub fn subscribe(&self) -> BoxStream<'static, T> {
        let shared = Arc::clone(&self.inner);
        let mut cursor = Cursor::register(Arc::clone(&self.inner));
        Box::pin(stream! {
            loop {
                // Register before checking so a push between the check and
                // the await still wakes us.
                let notified = shared.notify.notified();
                match cursor.next() {
                    Next::Item(item) => yield item,
                    Next::Done => break,
                    Next::Pending => notified.await,
                }
            }
        })
    }
}

impl<T: Clone + Send + 'static> Default for Fanout<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// One subscriber's read position. Dropping it releases whatever only this
/// subscriber was still holding.
struct Cursor<T> {
    inner: Arc<Shared<T>>,
    id: u64,
    position: usize,
}

impl<T: Clone> Cursor<T> {
    fn register(inner: Arc<Shared<T>>) -> Self {
        let (id, position) = {
            let mut state = inner.state.lock().expect("fanout lock poisoned");
            let id = state.next_id;
            state.next_id += 1;
            let position = state.base;
            state.cursors.insert(id, position);
            (id, position)
        };
        Self { inner, id, position }
    }

    fn next(&mut self) -> Next<T> {
        let mut state = self.inner.state.lock().expect("fanout lock poisoned");
        let item = state.items.get(self.position - state.base).cloned();
        match item {
            Some(item) => {
                self.position += 1;
                state.cursors.insert(self.id, self.position);
                state.release();
                Next::Item(item)
            }
            None if state.closed => Next::Done,
            None => Next::Pending,
        }
    }
}

impl<T> Drop for Cursor<T> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.inner.state.lock() {
            state.cursors.remove(&self.id);
            state.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn every_subscriber_sees_every_item() {
        let fanout = Fanout::new();
        let early = fanout.subscribe();
        fanout.push(1);
        fanout.push(2);
        let late = fanout.subscribe();
        fanout.push(3);
        fanout.close();

        assert_eq!(early.collect::<Vec<_>>().await, vec![1, 2, 3]);
        assert_eq!(late.collect::<Vec<_>>().await, vec![1, 2, 3]);
        assert_eq!(fanout.pushed(), 3);
        assert_eq!(fanout.retained(), 0);
    }

    #[tokio::test]
    async fn subscribers_wait_for_producer() {
        let fanout = Fanout::new();
        let readers: Vec<_> = (0..3).map(|_| fanout.subscribe()).collect();

        let producer = async {
            for i in 0..50u32 {
                fanout.push(i);
                tokio::task::yield_now().await;
            }
            fanout.close();
        };
        let consumers = futures::future::join_all(readers.into_iter().map(|r| r.collect::<Vec<_>>()));

        let ((), results) = tokio::join!(producer, consumers);
        let expected: Vec<u32> = (0..50).collect();
        for result in results {
            assert_eq!(result, expected);
        }
    }

    #[tokio::test]
    async fn spawned_subscribers() {
        let fanout = Fanout::new();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let reader = fanout.subscribe();
                tokio::spawn(async move { reader.collect::<Vec<String>>().await })
            })
            .collect();

        for word in ["a", "b", "c"] {
            fanout.push(word.to_string());
        }
        fanout.close();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), vec!["a", "b", "c"]);
        }
    }

    #[tokio::test]
    async fn push_after_close_ignored() {
        let fanout = Fanout::new();
        fanout.push(1);
        fanout.close();
        fanout.push(2);
        assert_eq!(fanout.subscribe().collect::<Vec<_>>().await, vec![1]);
    }

    #[tokio::test]
    async fn empty_closed_fanout() {
        let fanout: Fanout<u8> = Fanout::new();
        assert_eq!(fanout.pushed(), 0);
        fanout.close();
        assert!(fanout.subscribe().next().await.is_none());
    }

    #[tokio::test]
    async fn items_released_once_every_subscriber_has_read_them() {
        let fanout = Fanout::new();
        let mut fast = fanout.subscribe();
        let mut slow = fanout.subscribe();
        for i in 0..4 {
            fanout.push(i);
        }

        for i in 0..4 {
            assert_eq!(fast.next().await, Some(i));
        }
        assert_eq!(fanout.retained(), 4);

        assert_eq!(slow.next().await, Some(0));
        assert_eq!(slow.next().await, Some(1));
        assert_eq!(fanout.retained(), 2);

        drop(slow);
        assert_eq!(fanout.retained(), 0);
        assert_eq!(fanout.pushed(), 4);
    }

    #[tokio::test]
    async fn subscriber_keeping_pace_holds_one_item() {
        let fanout = Fanout::new();
        let mut reader = fanout.subscribe();
        for i in 0..1000u32 {
            fanout.push(i);
            assert_eq!(reader.next().await, Some(i));
            assert_eq!(fanout.retained(), 0);
        }
        assert_eq!(fanout.peak_retained(), 1);
    }

    #[tokio::test]
    async fn nothing_released_without_subscribers() {
        let fanout = Fanout::new();
        for i in 0..10 {
            fanout.push(i);
        }
        assert_eq!(fanout.retained(), 10);
        fanout.close();
        let all: Vec<i32> = fanout.subscribe().collect().await;
        assert_eq!(all.len(), 10);
    }
}
