use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::ProtectionMode;
use crate::threshold::MotionThreshold;

/// Every state change of the protection engine produces an Event.
/// Observers (CLI, notification layer) subscribe to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    ProtectionStarted {
        threshold: MotionThreshold,
        at: DateTime<Utc>,
    },
    ProtectionStopped {
        at: DateTime<Utc>,
    },
    /// Entered a trusted zone; motion is ignored.
    ProtectionPaused {
        at: DateTime<Utc>,
    },
    /// Left every trusted zone; motion is evaluated again.
    ProtectionResumed {
        at: DateTime<Utc>,
    },
    ScreenChanged {
        on: bool,
        at: DateTime<Utc>,
    },
    /// A qualifying motion sample arrived while armed.
    LockTriggered {
        magnitude: f64,
        threshold: MotionThreshold,
        at: DateTime<Utc>,
    },
    /// The lock capability was not active when a trigger fired.
    LockUnavailable {
        reason: String,
        at: DateTime<Utc>,
    },
    /// Sensitivity changed while armed; applies on the next start.
    SensitivityDeferred {
        level: f64,
        pending_threshold: MotionThreshold,
        at: DateTime<Utc>,
    },
    StatusSnapshot {
        mode: ProtectionMode,
        threshold: Option<MotionThreshold>,
        trusted: bool,
        screen_on: bool,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::ProtectionStarted { at, .. }
            | Event::ProtectionStopped { at }
            | Event::ProtectionPaused { at }
            | Event::ProtectionResumed { at }
            | Event::ScreenChanged { at, .. }
            | Event::LockTriggered { at, .. }
            | Event::LockUnavailable { at, .. }
            | Event::SensitivityDeferred { at, .. }
            | Event::StatusSnapshot { at, .. } => *at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag_and_timestamp() {
        let at = Utc::now();
        let event = Event::LockTriggered {
            magnitude: 61.5,
            threshold: MotionThreshold(50.0),
            at,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "LockTriggered");
        assert_eq!(json["threshold"], 50.0);

        let parsed: Event = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.at(), at);
    }

    #[test]
    fn every_variant_exposes_its_timestamp() {
        let at = Utc::now();
        let events = [
            Event::ProtectionStopped { at },
            Event::ScreenChanged { on: false, at },
            Event::StatusSnapshot {
                mode: ProtectionMode::Paused,
                threshold: Some(MotionThreshold(35.0)),
                trusted: true,
                screen_on: true,
                at,
            },
        ];
        assert!(events.iter().all(|e| e.at() == at));
    }
}
