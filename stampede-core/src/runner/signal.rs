use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// One-shot latch: once fired it stays fired and wakes every waiter.
#[derive(Debug, Default)]
pub struct Signal {
    fired: AtomicBool,
    notify: Notify,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fire(&self) {
        self.fired.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    pub async fn wait(&self) {
        loop {
            // Register before checking so a concurrent `fire` can't slip between the two.
            let notified = self.notify.notified();
            if self.is_fired() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn wakes_waiters_and_stays_fired() {
        let signal = Arc::new(Signal::new());
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.wait().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!signal.is_fired());
        signal.fire();

        match tokio::time::timeout(Duration::from_secs(1), waiter).await {
            Ok(Ok(())) => {}
            other => panic!("waiter did not complete: {other:?}"),
        }

        // already fired: returns immediately
        signal.wait().await;
        assert!(signal.is_fired());
    }
}
