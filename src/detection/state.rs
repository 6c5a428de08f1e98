//! Recorder state machine.
//!
//! The recorder moves between three states and announces every
//! transition on a channel. The change monitor subscribes and only
//! samples frames while recording.

use crossbeam::channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Recorder lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecorderState {
    /// Nothing is running.
    Idle,
    /// The preview is live but nothing is monitored.
    PreviewOnly,
    /// Preview plus change monitoring.
    Recording,
}

impl RecorderState {
    /// Numeric code used by the metrics gauge.
    pub fn code(self) -> i64 {
        match self {
            RecorderState::Idle => 0,
            RecorderState::PreviewOnly => 1,
            RecorderState::Recording => 2,
        }
    }
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecorderState::Idle => "idle",
            RecorderState::PreviewOnly => "preview",
            RecorderState::Recording => "recording",
        };
        f.write_str(name)
    }
}

/// A completed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateEvent {
    /// State before the transition.
    pub from: RecorderState,
    /// State after the transition.
    pub to: RecorderState,
}

/// Rejected recorder transitions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    /// Recording requires an open preview.
    #[error("recording requires an active preview")]
    NotPreviewing,
}

/// Owns the recorder state and its subscribers.
#[derive(Debug)]
pub struct RecorderStateMachine {
    state: RecorderState,
    subscribers: Vec<Sender<StateEvent>>,
}

impl RecorderStateMachine {
    /// Creates an idle recorder with no subscribers.
    pub fn new() -> Self {
        Self {
            state: RecorderState::Idle,
            subscribers: Vec::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Whether the state is `Recording`.
    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    /// Returns a receiver that sees every transition from now on.
    pub fn subscribe(&mut self) -> Receiver<StateEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// `Idle -> PreviewOnly`. No-op when already previewing or recording.
    pub fn start_preview(&mut self) -> RecorderState {
        if self.state == RecorderState::Idle {
            self.transition(RecorderState::PreviewOnly);
        }
        self.state
    }

    /// Stops everything and returns to `Idle`.
    pub fn stop_preview(&mut self) -> RecorderState {
        if self.state != RecorderState::Idle {
            self.transition(RecorderState::Idle);
        }
        self.state
    }

    /// Switches between `PreviewOnly` and `Recording`.
    pub fn toggle_recording(&mut self) -> Result<RecorderState, StateError> {
        let next = match self.state {
            RecorderState::Idle => return Err(StateError::NotPreviewing),
            RecorderState::PreviewOnly => RecorderState::Recording,
            RecorderState::Recording => RecorderState::PreviewOnly,
        };
        self.transition(next);
        Ok(self.state)
    }

    fn transition(&mut self, to: RecorderState) {
        let event = StateEvent {
            from: self.state,
            to,
        };
        self.state = to;
        tracing::info!(from = %event.from, to = %event.to, "Recorder state changed");

        // Drop subscribers whose receiver is gone.
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }
}

impl Default for RecorderStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_idle() {
        let machine = RecorderStateMachine::new();
        assert_eq!(machine.state(), RecorderState::Idle);
        assert!(!machine.is_recording());
    }

    #[test]
    fn test_cannot_record_from_idle() {
        let mut machine = RecorderStateMachine::new();
        assert_eq!(machine.toggle_recording(), Err(StateError::NotPreviewing));
        assert_eq!(machine.state(), RecorderState::Idle);
    }

    #[test]
    fn test_full_cycle_publishes_events_in_order() {
        let mut machine = RecorderStateMachine::new();
        let rx = machine.subscribe();

        machine.start_preview();
        machine.toggle_recording().unwrap();
        assert!(machine.is_recording());
        machine.toggle_recording().unwrap();
        machine.stop_preview();

        let events: Vec<StateEvent> = rx.try_iter().collect();
        use RecorderState::*;
        assert_eq!(
            events,
            vec![
                StateEvent { from: Idle, to: PreviewOnly },
                StateEvent { from: PreviewOnly, to: Recording },
                StateEvent { from: Recording, to: PreviewOnly },
                StateEvent { from: PreviewOnly, to: Idle },
            ]
        );
    }

    #[test]
    fn test_redundant_calls_publish_nothing() {
        let mut machine = RecorderStateMachine::new();
        let rx = machine.subscribe();

        machine.stop_preview();
        machine.start_preview();
        machine.start_preview();

        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn test_stop_while_recording_goes_idle() {
        let mut machine = RecorderStateMachine::new();
        machine.start_preview();
        machine.toggle_recording().unwrap();

        assert_eq!(machine.stop_preview(), RecorderState::Idle);
    }

    #[test]
    fn test_dropped_subscribers_pruned() {
        let mut machine = RecorderStateMachine::new();
        let kept = machine.subscribe();
        drop(machine.subscribe());
        assert_eq!(machine.subscriber_count(), 2);

        machine.start_preview();
        assert_eq!(machine.subscriber_count(), 1);
        assert_eq!(kept.try_recv().unwrap().to, RecorderState::PreviewOnly);
    }
}
