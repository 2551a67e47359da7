use chrono::NaiveDateTime;
use qrsign_core::domain::{Event, Template, TimeWindowClock};
use qrsign_core::ports::Clock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// A running rotation loop. Dropping the handle clears the running flag
/// without waiting for the task.
pub struct RotationHandle {
    running: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl RotationHandle {
    /// Spawn the polling loop for `template` on the current runtime
    pub fn spawn(
        template: Template,
        window: TimeWindowClock,
        clock: Arc<dyn Clock>,
        poll_interval: Duration,
        event_tx: mpsc::UnboundedSender<Event>,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();

        let join = tokio::spawn(async move {
            run_rotation(template, window, clock, poll_interval, event_tx, flag).await;
        });

        Self {
            running,
            join: Some(join),
        }
    }

    /// False once stop was requested or the loop exited on its own
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire) && self.join.as_ref().is_some_and(|join| !join.is_finished())
    }

    /// Clear the running flag and wait for the loop to exit
    pub async fn stop(mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(join) = self.join.take() {
            if let Err(e) = join.await {
                warn!("Rotation task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for RotationHandle {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Poll the clock every `poll_interval`, publish a `Tick` each time and a
/// `SlotChanged` whenever the slot start moves.
async fn run_rotation(
    template: Template,
    window: TimeWindowClock,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    event_tx: mpsc::UnboundedSender<Event>,
    running: Arc<AtomicBool>,
) {
    info!("Rotation loop started, epoch {}", window.epoch());

    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut shown: Option<NaiveDateTime> = None;

    while running.load(Ordering::Acquire) {
        ticker.tick().await;
        if !running.load(Ordering::Acquire) {
            break;
        }

        let now = clock.now();
        let slot = window.slot_at(now);

        if shown != Some(slot.current) {
            debug!("Slot changed to {}", slot.current);
            let payload = template.payload_at(slot.current);
            if event_tx.send(Event::SlotChanged { slot, payload }).is_err() {
                warn!("Event receiver dropped, stopping rotation");
                break;
            }
            shown = Some(slot.current);
        }

        let tick = Event::Tick {
            now,
            seconds_to_next: slot.seconds_to_next,
        };
        if event_tx.send(tick).is_err() {
            warn!("Event receiver dropped, stopping rotation");
            break;
        }
    }

    running.store(false, Ordering::Release);
    info!("Rotation loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use qrsign_core::domain::{Identifiers, PayloadLayout, SlotInterval};
    use qrsign_core::ports::MockClock;

    fn epoch() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2025-03-13T12:00:00.000", "%Y-%m-%dT%H:%M:%S%.f").unwrap()
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<Event>) -> Event {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("event within timeout")
            .expect("channel open")
    }

    #[tokio::test]
    async fn test_rotation_publishes_slot_then_ticks() {
        let template = Template::generate(&Identifiers::default(), epoch(), &PayloadLayout::default());
        let window = TimeWindowClock::new(epoch(), SlotInterval::default());
        let clock = Arc::new(MockClock::new(epoch() + TimeDelta::milliseconds(7_400)));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = RotationHandle::spawn(template, window, clock.clone(), Duration::from_millis(5), tx);

        match next_event(&mut rx).await {
            Event::SlotChanged { slot, payload } => {
                assert_eq!(slot.current, epoch() + TimeDelta::seconds(5));
                assert!(payload.contains("createTime=2025-03-13T12:00:05.000&"), "{payload}");
            }
            other => panic!("expected SlotChanged, got {other:?}"),
        }
        match next_event(&mut rx).await {
            Event::Tick { seconds_to_next, .. } => assert_eq!(seconds_to_next, 3),
            other => panic!("expected Tick, got {other:?}"),
        }

        // Same slot: only ticks until the clock crosses the boundary
        match next_event(&mut rx).await {
            Event::Tick { .. } => {}
            other => panic!("expected Tick, got {other:?}"),
        }

        clock.advance(TimeDelta::seconds(3));
        let changed = loop {
            if let Event::SlotChanged { slot, .. } = next_event(&mut rx).await {
                break slot;
            }
        };
        assert_eq!(changed.current, epoch() + TimeDelta::seconds(10));

        assert!(handle.is_running());
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_rotation_exits_when_receiver_dropped() {
        let template = Template::generate(&Identifiers::default(), epoch(), &PayloadLayout::default());
        let window = TimeWindowClock::new(epoch(), SlotInterval::default());
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        let handle = RotationHandle::spawn(template, window, Arc::new(MockClock::new(epoch())), Duration::from_millis(5), tx);

        for _ in 0..100 {
            if !handle.is_running() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!handle.is_running());
        handle.stop().await;
    }
}
