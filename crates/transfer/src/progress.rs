use std::sync::{Arc, Mutex};

/// Point-in-time view of a file's block progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub uploaded: usize,
    pub total: usize,
}

impl ProgressSnapshot {
    pub fn is_complete(&self) -> bool {
        self.uploaded >= self.total
    }
}

/// Callback invoked after each counted block.
pub type ProgressCallback = Arc<dyn Fn(ProgressSnapshot) + Send + Sync>;

/// Block counter shared by all transfer tasks of one file.
///
/// Observational only. The lock is held for the increment and released
/// before the callback runs.
pub struct TransferProgress {
    inner: Mutex<ProgressSnapshot>,
    callback: Option<ProgressCallback>,
}

impl TransferProgress {
    pub fn new(total: usize) -> Self {
        Self {
            inner: Mutex::new(ProgressSnapshot { uploaded: 0, total }),
            callback: None,
        }
    }

    pub fn with_callback(total: usize, callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            ..Self::new(total)
        }
    }

    /// Counts one more finished block and returns the new snapshot.
    pub fn increment(&self) -> ProgressSnapshot {
        let snapshot = {
            let mut s = self.inner.lock().unwrap();
            s.uploaded += 1;
            *s
        };
        if let Some(cb) = &self.callback {
            cb(snapshot);
        }
        snapshot
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        *self.inner.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn counts_up() {
        let p = TransferProgress::new(3);
        assert_eq!(p.snapshot(), ProgressSnapshot { uploaded: 0, total: 3 });
        p.increment();
        let s = p.increment();
        assert_eq!(s.uploaded, 2);
        assert!(!s.is_complete());
        assert!(p.increment().is_complete());
    }

    #[test]
    fn callback_sees_each_increment() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let p = TransferProgress::with_callback(
            2,
            Arc::new(move |snap| s.lock().unwrap().push(snap.uploaded)),
        );
        p.increment();
        p.increment();
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn concurrent_increments() {
        let p = Arc::new(TransferProgress::new(1000));
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let p = Arc::clone(&p);
                thread::spawn(move || {
                    for _ in 0..100 {
                        p.increment();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(p.snapshot().uploaded, 1000);
    }
}
