//! Terminal input and frame ticks.

use anyhow::Result;
use crossterm::event::{Event as CrosstermEvent, EventStream, KeyEvent, KeyEventKind};
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// Terminal events.
#[derive(Debug, Clone)]
pub enum Event {
    /// Key press.
    Key(KeyEvent),
    /// Terminal resize.
    Resize(u16, u16),
    /// Frame tick; drives the pacer and smooth scrolling.
    Tick,
}

/// Reads crossterm's event stream and interleaves frame ticks.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    task: tokio::task::JoinHandle<()>,
}

impl EventHandler {
    /// Start reading, ticking once per `frame`.
    pub fn new(frame: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            let mut reader = EventStream::new();
            let mut ticks = tokio::time::interval(frame);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                let event = tokio::select! {
                    maybe_event = reader.next() => match maybe_event {
                        Some(Ok(CrosstermEvent::Key(key))) if key.kind == KeyEventKind::Press => {
                            Event::Key(key)
                        }
                        Some(Ok(CrosstermEvent::Resize(w, h))) => Event::Resize(w, h),
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "Error reading terminal event, stopping event loop");
                            break;
                        }
                        None => {
                            tracing::debug!("Event stream ended, stopping event loop");
                            break;
                        }
                    },
                    _ = ticks.tick() => Event::Tick,
                };
                if tx.send(event).is_err() {
                    tracing::debug!("Event channel closed, receiver dropped");
                    break;
                }
            }
        });

        Self { rx, task }
    }

    /// Wait for the next event.
    pub async fn next(&mut self) -> Result<Event> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| anyhow::anyhow!("Event channel closed"))
    }
}

impl Drop for EventHandler {
    fn drop(&mut self) {
        self.task.abort();
    }
}
