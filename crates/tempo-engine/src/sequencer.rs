//! Phase sequencing: narrating work steps before content exists.
//!
//! A [`PhasePlan`] fixes when each step starts and completes. Running it
//! spawns one timer task that reports step transitions through a sink and
//! finishes with a single [`PhaseEvent::Completed`].

use std::time::Duration;

use rand::Rng;
use tempo_types::{StepStatus, TaskStep};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::config::SequencerConfig;
use crate::dispose::Disposer;

/// A step transition or the end of the sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseEvent {
    Step { id: String, status: StepStatus },
    Completed,
}

/// When one step starts and completes, relative to the start of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub id: String,
    pub starts_at: Duration,
    pub completes_at: Duration,
}

/// Timeline for a whole sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhasePlan {
    steps: Vec<PlannedStep>,
}

impl PhasePlan {
    /// Lay steps end to end, each lasting a uniform random duration in
    /// `[min_step, max_step]`.
    pub fn new(steps: &[TaskStep], config: &SequencerConfig, rng: &mut impl Rng) -> Self {
        let mut at = Duration::ZERO;
        let steps = steps
            .iter()
            .map(|step| {
                let length = rng.random_range(config.min_step..=config.max_step);
                let planned = PlannedStep {
                    id: step.id.clone(),
                    starts_at: at,
                    completes_at: at + length,
                };
                at += length;
                planned
            })
            .collect();
        Self { steps }
    }

    pub fn steps(&self) -> &[PlannedStep] {
        &self.steps
    }

    /// When the final step completes.
    pub fn total(&self) -> Duration {
        self.steps
            .last()
            .map(|s| s.completes_at)
            .unwrap_or(Duration::ZERO)
    }

    /// Every transition in firing order.
    fn timeline(&self) -> Vec<(Duration, PhaseEvent)> {
        self.steps
            .iter()
            .flat_map(|step| {
                [
                    (
                        step.starts_at,
                        PhaseEvent::Step {
                            id: step.id.clone(),
                            status: StepStatus::InProgress,
                        },
                    ),
                    (
                        step.completes_at,
                        PhaseEvent::Step {
                            id: step.id.clone(),
                            status: StepStatus::Completed,
                        },
                    ),
                ]
            })
            .collect()
    }
}

/// Run a plan on a spawned task, reporting through `sink`.
///
/// Disposing the returned handle cancels every outstanding transition; after
/// that the sink is never called again.
pub fn spawn_sequence<F>(plan: PhasePlan, mut sink: F) -> Disposer
where
    F: FnMut(PhaseEvent) + Send + 'static,
{
    let token = CancellationToken::new();
    let cancelled = token.clone();
    let handle = tokio::spawn(async move {
        let start = Instant::now();
        for (at, event) in plan.timeline() {
            tokio::select! {
                _ = cancelled.cancelled() => return,
                _ = sleep_until(start + at) => {}
            }
            sink(event);
        }
        if cancelled.is_cancelled() {
            return;
        }
        tracing::debug!(elapsed_ms = start.elapsed().as_millis() as u64, "Phase sequence complete");
        sink(PhaseEvent::Completed);
    });
    Disposer::new(token, handle)
}

// ─────────────────────────────────────────────────────────────────────────────
// Task Board
// ─────────────────────────────────────────────────────────────────────────────

/// The visible step list for the current turn.
#[derive(Debug, Clone, Default)]
pub struct TaskBoard {
    steps: Vec<TaskStep>,
}

impl TaskBoard {
    /// Create an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list with a fresh sequence.
    pub fn load(&mut self, steps: Vec<TaskStep>) {
        self.steps = steps;
    }

    /// Move a step forward. Unknown ids are ignored and return `Ok(false)`.
    pub fn apply(&mut self, id: &str, status: StepStatus) -> tempo_types::Result<bool> {
        match self.steps.iter_mut().find(|s| s.id == id) {
            Some(step) => {
                step.advance(status)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Get the current steps.
    pub fn steps(&self) -> &[TaskStep] {
        &self.steps
    }

    /// Get a step by id.
    pub fn step(&self, id: &str) -> Option<&TaskStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Check if every step is completed.
    pub fn all_completed(&self) -> bool {
        !self.steps.is_empty() && self.steps.iter().all(|s| s.status() == StepStatus::Completed)
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Remove all steps.
    pub fn clear(&mut self) {
        self.steps.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parking_lot::Mutex;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn steps(n: usize) -> Vec<TaskStep> {
        TaskStep::sequence((1..=n).map(|i| format!("Step {i}")))
    }

    fn recorder() -> (Arc<Mutex<Vec<(Duration, PhaseEvent)>>>, impl FnMut(PhaseEvent) + Send + 'static) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink_log = log.clone();
        let start = Instant::now();
        let sink = move |event| sink_log.lock().push((start.elapsed(), event));
        (log, sink)
    }

    #[test]
    fn test_plan_lays_steps_end_to_end() {
        let mut rng = StdRng::seed_from_u64(42);
        let plan = PhasePlan::new(&steps(4), &SequencerConfig::default(), &mut rng);

        let planned = plan.steps();
        assert_eq!(planned[0].starts_at, Duration::ZERO);
        for pair in planned.windows(2) {
            assert_eq!(pair[0].completes_at, pair[1].starts_at);
        }
        for step in planned {
            let length = step.completes_at - step.starts_at;
            assert!(length >= Duration::from_millis(800));
            assert!(length <= Duration::from_millis(1500));
        }
        assert_eq!(plan.total(), planned[3].completes_at);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_after_last_step() {
        let config = SequencerConfig::new()
            .with_step_duration(Duration::from_millis(100), Duration::from_millis(100));
        let plan = PhasePlan::new(&steps(3), &config, &mut StdRng::seed_from_u64(1));
        let (log, sink) = recorder();

        let _disposer = spawn_sequence(plan, sink);
        tokio::time::sleep(Duration::from_secs(1)).await;

        let log = log.lock();
        assert_eq!(log.len(), 7);
        assert_eq!(
            log[0].1,
            PhaseEvent::Step {
                id: "1".into(),
                status: StepStatus::InProgress
            }
        );
        // completed of step 1 precedes in_progress of step 2
        assert_eq!(
            log[1].1,
            PhaseEvent::Step {
                id: "1".into(),
                status: StepStatus::Completed
            }
        );
        assert_eq!(log[1].0, Duration::from_millis(100));
        assert_eq!(
            log[5].1,
            PhaseEvent::Step {
                id: "3".into(),
                status: StepStatus::Completed
            }
        );
        assert_eq!(log[6], (Duration::from_millis(300), PhaseEvent::Completed));
        assert_eq!(
            log.iter().filter(|(_, e)| *e == PhaseEvent::Completed).count(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_everything() {
        let config = SequencerConfig::new()
            .with_step_duration(Duration::from_millis(100), Duration::from_millis(100));
        let plan = PhasePlan::new(&steps(3), &config, &mut StdRng::seed_from_u64(1));
        let (log, sink) = recorder();

        let mut disposer = spawn_sequence(plan, sink);
        tokio::time::sleep(Duration::from_millis(150)).await;
        disposer.dispose();
        disposer.dispose();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let log = log.lock();
        assert_eq!(log.len(), 3);
        assert!(!log.iter().any(|(_, e)| *e == PhaseEvent::Completed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_plan_completes_immediately() {
        let (log, sink) = recorder();
        let _disposer = spawn_sequence(PhasePlan::default(), sink);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(log.lock().as_slice(), &[(Duration::ZERO, PhaseEvent::Completed)]);
    }

    #[test]
    fn test_board_rejects_regression() {
        let mut board = TaskBoard::new();
        board.load(steps(2));

        assert!(board.apply("1", StepStatus::Completed).unwrap());
        assert!(board.apply("1", StepStatus::InProgress).is_err());
        assert!(!board.apply("9", StepStatus::Completed).unwrap());
        assert!(!board.all_completed());

        board.apply("2", StepStatus::Completed).unwrap();
        assert!(board.all_completed());

        board.clear();
        assert!(board.is_empty());
        assert!(!board.all_completed());
    }
}
