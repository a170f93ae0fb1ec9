// src/queue.rs
//
// =============================================================================
// DURALOG: SUBMISSION QUEUE
// =============================================================================
//
// A bounded, thread-safe FIFO between producer threads and the committer.
// `std::sync::mpsc::sync_channel` already gives us exactly this shape: a
// bounded capacity, a `Sender` cloneable across producer threads, blocking
// `send` when full, and a single `Receiver` owned by the committer.

use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError};

use crate::codec::Record;

/// The producer-facing half: cheap to clone, one per submitting thread (or
/// shared behind an `Arc<DuraLog>`).
#[derive(Clone)]
pub struct QueueHandle {
    sender: SyncSender<Record>,
}

impl QueueHandle {
    /// Enqueues a record, blocking if the queue is at capacity.
    ///
    /// The only failure mode is the committer having dropped its `Receiver`,
    /// which only happens after `close()` — at that point further appends are
    /// best-effort and we drop the record rather than panic the caller.
    pub fn put(&self, record: Record) {
        let _ = self.sender.send(record);
    }
}

/// The committer-facing half: the sole consumer.
pub struct SubmissionQueue {
    receiver: Receiver<Record>,
}

impl SubmissionQueue {
    /// Creates a bounded queue with the given capacity, returning the
    /// producer handle and the consumer side.
    pub fn bounded(capacity: usize) -> (QueueHandle, SubmissionQueue) {
        let (sender, receiver) = mpsc::sync_channel(capacity);
        (QueueHandle { sender }, SubmissionQueue { receiver })
    }

    /// Drains every record currently queued without blocking. Returns an
    /// empty `Vec` if nothing is queued.
    pub fn drain_nowait(&self) -> Vec<Record> {
        let mut records = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(record) => records.push(record),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break,
            }
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Record;

    #[test]
    fn drains_in_fifo_order() {
        let (handle, queue) = SubmissionQueue::bounded(8);
        handle.put(Record::Text("a".into()));
        handle.put(Record::Text("b".into()));
        handle.put(Record::Text("c".into()));

        let drained = queue.drain_nowait();
        assert_eq!(
            drained,
            vec![
                Record::Text("a".into()),
                Record::Text("b".into()),
                Record::Text("c".into()),
            ]
        );
    }

    #[test]
    fn drain_on_empty_queue_is_empty() {
        let (_handle, queue) = SubmissionQueue::bounded(8);
        assert!(queue.drain_nowait().is_empty());
    }

    #[test]
    fn multiple_producers_interleave_but_each_stays_ordered() {
        let (handle, queue) = SubmissionQueue::bounded(64);
        let mut threads = Vec::new();
        for producer in 0..4 {
            let handle = handle.clone();
            threads.push(std::thread::spawn(move || {
                for i in 0..10 {
                    handle.put(Record::Text(format!("p{producer}-{i}")));
                }
            }));
        }
        for t in threads {
            t.join().unwrap();
        }
        let drained = queue.drain_nowait();
        assert_eq!(drained.len(), 40);
        for producer in 0..4 {
            let mut last = -1i32;
            for record in &drained {
                if let Record::Text(s) = record {
                    if let Some(rest) = s.strip_prefix(&format!("p{producer}-")) {
                        let n: i32 = rest.parse().unwrap();
                        assert!(n > last, "producer {producer} records out of order");
                        last = n;
                    }
                }
            }
        }
    }
}
