use std::collections::VecDeque;
use std::sync::Mutex;

use uuid::Uuid;

/// In-memory FIFO work queue of job ids.
///
/// `dequeue` pops under the lock, so a queued job is claimed by exactly one
/// worker even with several workers draining concurrently.
pub struct JobQueue {
    items: Mutex<VecDeque<Uuid>>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
        }
    }

    /// Enqueue a job for processing.
    pub fn enqueue(&self, job_id: Uuid) {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.push_back(job_id);
        metrics::gauge!("generation_queue_depth").set(items.len() as f64);
    }

    /// Claim the next queued job, if any.
    pub fn dequeue(&self) -> Option<Uuid> {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        let job_id = items.pop_front();
        metrics::gauge!("generation_queue_depth").set(items.len() as f64);
        job_id
    }

    /// Current number of pending jobs.
    pub fn depth(&self) -> usize {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn fifo_order() {
        let queue = JobQueue::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        queue.enqueue(a);
        queue.enqueue(b);
        queue.enqueue(c);

        assert_eq!(queue.depth(), 3);
        assert_eq!(queue.dequeue(), Some(a));
        assert_eq!(queue.dequeue(), Some(b));
        assert_eq!(queue.dequeue(), Some(c));
        assert_eq!(queue.dequeue(), None);
    }

    #[test]
    fn each_job_claimed_by_exactly_one_worker() {
        let queue = Arc::new(JobQueue::new());
        let expected: HashSet<Uuid> = (0..100)
            .map(|_| {
                let id = Uuid::new_v4();
                queue.enqueue(id);
                id
            })
            .collect();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let queue = queue.clone();
                std::thread::spawn(move || {
                    let mut claimed = Vec::new();
                    while let Some(id) = queue.dequeue() {
                        claimed.push(id);
                    }
                    claimed
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "job {id} claimed twice");
            }
        }
        assert_eq!(seen, expected);
    }
}
