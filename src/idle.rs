use tokio::task::JoinHandle;

/// Handle of a session's pending idle teardown.
///
/// Every arm or cancel bumps the generation, and the spawned task reports
/// the generation it was armed with. A task that lost a race with a cancel
/// sees a stale generation and does nothing.
#[derive(Debug, Default)]
pub(crate) struct IdleTimer {
    generation: u64,
    handle: Option<JoinHandle<()>>
}

impl IdleTimer {
    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Replaces any pending timer with the task built by `spawn`, which
    /// receives the new generation.
    pub fn arm(&mut self, spawn: impl FnOnce(u64) -> JoinHandle<()>) {
        self.cancel();
        self.handle = Some(spawn(self.generation));
    }

    pub fn cancel(&mut self) {
        self.generation += 1;

        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Claims the expiry for `generation`. Called from inside the timer
    /// task, so the handle is released without aborting it.
    pub fn fire(&mut self, generation: u64) -> bool {
        if self.handle.is_none() || generation != self.generation {
            return false;
        }

        self.generation += 1;
        self.handle = None;
        true
    }
}

impl Drop for IdleTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::pending;

    use super::*;

    #[tokio::test]
    async fn stale_generation_does_not_fire() {
        let mut timer = IdleTimer::default();
        timer.arm(|_| tokio::spawn(pending()));
        let first = timer.generation();

        timer.arm(|_| tokio::spawn(pending()));
        assert!(!timer.fire(first));
        assert!(timer.fire(timer.generation()));
        assert!(!timer.is_armed());
    }

    #[tokio::test]
    async fn cancel_disarms() {
        let mut timer = IdleTimer::default();
        timer.arm(|_| tokio::spawn(pending()));
        let generation = timer.generation();

        timer.cancel();
        assert!(!timer.is_armed());
        assert!(!timer.fire(generation));
    }
}
