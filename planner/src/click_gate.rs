use tokio::time::{Duration, Instant};

/// Swallows map clicks for a short window after a UI action.
///
/// Buttons that remove markers or restore the location sit on top of the map,
/// so the click that triggered them also reaches the map surface.
#[derive(Debug, Default)]
pub struct ClickGate {
    blocked_until: Option<Instant>,
}

impl ClickGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks clicks for `window` from now. Re-blocking restarts the window.
    pub fn block(&mut self, window: Duration) {
        self.blocked_until = Some(Instant::now() + window);
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked_until.is_some_and(|until| Instant::now() < until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(400);

    #[test]
    fn test_open_by_default() {
        assert!(!ClickGate::new().is_blocked());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unblocks_after_window() {
        let mut gate = ClickGate::new();
        gate.block(WINDOW);
        assert!(gate.is_blocked());

        tokio::time::advance(Duration::from_millis(399)).await;
        assert!(gate.is_blocked());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(!gate.is_blocked());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reblocking_restarts_instead_of_stacking() {
        let mut gate = ClickGate::new();
        gate.block(WINDOW);
        tokio::time::advance(Duration::from_millis(300)).await;
        gate.block(WINDOW);
        gate.block(WINDOW);

        // Stacked windows would keep the gate closed until 1500 ms.
        tokio::time::advance(Duration::from_millis(400)).await;
        assert!(!gate.is_blocked());
    }
}
