//! Timed step walker for battle-step presentation.
//!
//! The walker advances a selection through a list of named steps, pausing
//! one tick between moves so viewers can follow the progression. "Current
//! step" and "target step" are plain state and advancement is a pure
//! transition; a tick-driven task walks until the target is reached and is
//! cancellable at any point. No thread parks on a monitor.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Where a walk is heading.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepTarget {
    /// A named step in the current list.
    Step(String),
    /// The final step, whatever it currently is.
    Last,
}

/// Outcome of one transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkStatus {
    /// Moved one step; the target is still ahead.
    Advanced,
    /// The target is reached (or there is nothing to walk to).
    Done,
}

/// The walker's plain state.
#[derive(Debug, Default)]
pub struct StepWalker {
    steps: Vec<String>,
    current: usize,
    target: Option<StepTarget>,
}

impl StepWalker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the step list, selecting the first step. A target that no
    /// longer exists is cleared.
    pub fn list_steps(&mut self, steps: Vec<String>) {
        self.steps = steps;
        self.current = 0;
        if let Some(StepTarget::Step(name)) = &self.target
            && !self.steps.iter().any(|step| step == name)
        {
            self.target = None;
        }
    }

    pub fn current_step(&self) -> Option<&str> {
        self.steps.get(self.current).map(String::as_str)
    }

    /// Sets the walk target. An unknown step name is ignored.
    pub fn set_target(&mut self, target: StepTarget) {
        if let StepTarget::Step(name) = &target
            && !self.steps.iter().any(|step| step == name)
        {
            tracing::info!(step = %name, "could not find step");
            return;
        }
        self.target = Some(target);
    }

    /// Clears the target, releasing any driver mid-walk.
    pub fn deactivate(&mut self) {
        self.target = None;
    }

    /// True when no further movement is needed.
    pub fn done(&self) -> bool {
        match &self.target {
            None => true,
            Some(StepTarget::Last) => self.steps.is_empty() || self.current == self.steps.len() - 1,
            Some(StepTarget::Step(name)) => {
                // A target missing from the list means there is nothing
                // sensible to walk to.
                !self.steps.iter().any(|step| step == name)
                    || self.current_step() == Some(name.as_str())
            }
        }
    }

    /// Pure transition: move the selection one step toward the target,
    /// wrapping at the end of the list.
    pub fn advance(&mut self) -> WalkStatus {
        if self.done() {
            self.target = None;
            return WalkStatus::Done;
        }
        self.current = (self.current + 1) % self.steps.len();
        if self.done() {
            self.target = None;
            WalkStatus::Done
        } else {
            WalkStatus::Advanced
        }
    }
}

/// A running walk. Await [`WalkHandle::finished`] for completion or call
/// [`WalkHandle::cancel`] to stop mid-walk.
pub struct WalkHandle {
    task: JoinHandle<()>,
}

impl WalkHandle {
    pub async fn finished(self) {
        let _ = self.task.await;
    }

    pub fn cancel(&self) {
        self.task.abort();
    }
}

/// Starts walking toward `target`, one step per `tick`.
pub fn walk_to(
    walker: Arc<Mutex<StepWalker>>,
    target: StepTarget,
    tick: Duration,
) -> WalkHandle {
    walker
        .lock()
        .expect("walker lock poisoned")
        .set_target(target);
    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick);
        // The first tick fires immediately; skip it so each move is paced.
        interval.tick().await;
        loop {
            interval.tick().await;
            let status = walker.lock().expect("walker lock poisoned").advance();
            if status == WalkStatus::Done {
                break;
            }
        }
    });
    WalkHandle { task }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listed(steps: &[&str]) -> StepWalker {
        let mut walker = StepWalker::new();
        walker.list_steps(steps.iter().map(|s| s.to_string()).collect());
        walker
    }

    #[test]
    fn advances_to_a_named_step() {
        let mut walker = listed(&["open", "fire", "casualties", "retreat"]);
        walker.set_target(StepTarget::Step("casualties".into()));
        assert_eq!(walker.advance(), WalkStatus::Advanced);
        assert_eq!(walker.advance(), WalkStatus::Done);
        assert_eq!(walker.current_step(), Some("casualties"));
        // Target is consumed; further advances are no-ops.
        assert_eq!(walker.advance(), WalkStatus::Done);
        assert_eq!(walker.current_step(), Some("casualties"));
    }

    #[test]
    fn walks_wrap_around_toward_an_earlier_step() {
        let mut walker = listed(&["a", "b", "c"]);
        walker.set_target(StepTarget::Step("c".into()));
        while walker.advance() == WalkStatus::Advanced {}
        walker.set_target(StepTarget::Step("a".into()));
        assert_eq!(walker.advance(), WalkStatus::Done);
        assert_eq!(walker.current_step(), Some("a"));
    }

    #[test]
    fn unknown_targets_are_ignored() {
        let mut walker = listed(&["a", "b"]);
        walker.set_target(StepTarget::Step("missing".into()));
        assert!(walker.done());
        assert_eq!(walker.current_step(), Some("a"));
    }

    #[test]
    fn relisting_clears_a_vanished_target() {
        let mut walker = listed(&["a", "b", "c"]);
        walker.set_target(StepTarget::Step("c".into()));
        walker.list_steps(vec!["x".into(), "y".into()]);
        assert!(walker.done());
        assert_eq!(walker.current_step(), Some("x"));
    }

    #[tokio::test]
    async fn driver_walks_to_the_last_step() {
        let walker = Arc::new(Mutex::new(listed(&["a", "b", "c"])));
        let handle = walk_to(walker.clone(), StepTarget::Last, Duration::from_millis(1));
        handle.finished().await;
        assert_eq!(
            walker.lock().unwrap().current_step(),
            Some("c")
        );
    }

    #[tokio::test]
    async fn a_cancelled_walk_stops_where_it_is() {
        let walker = Arc::new(Mutex::new(listed(&["a", "b", "c", "d", "e"])));
        let handle = walk_to(walker.clone(), StepTarget::Last, Duration::from_secs(60));
        handle.cancel();
        handle.finished().await;
        let walker = walker.lock().unwrap();
        assert_ne!(walker.current_step(), Some("e"));
    }

    #[tokio::test]
    async fn deactivate_releases_the_driver() {
        let walker = Arc::new(Mutex::new(listed(&["a", "b", "c"])));
        let handle = walk_to(walker.clone(), StepTarget::Last, Duration::from_millis(5));
        walker.lock().unwrap().deactivate();
        handle.finished().await;
    }
}
