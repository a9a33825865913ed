//! Transition table for timer records.

use crate::model::session::SessionToken;
use crate::model::timer::{TimerId, TimerRecord, TimerStatus};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Closed set of timer transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerAction {
    /// New running record with the given id.
    Create(TimerId),
    /// Paused -> running, no credit.
    Continue,
    /// Running -> paused, credits the elapsed interval.
    Pause,
    /// Live tick, credits the elapsed interval.
    Update,
    /// Running marker re-adopted without a live schedule, credits the gap.
    Restore,
    /// Running marker re-adopted without a live schedule, gap dropped.
    ForcePause,
    /// Removes the record.
    Delete,
}

impl TimerAction {
    /// Stable action name used in log events.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Continue => "continue",
            Self::Pause => "pause",
            Self::Update => "update",
            Self::Restore => "restore",
            Self::ForcePause => "forcepause",
            Self::Delete => "delete",
        }
    }
}

/// Result of applying one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Write this record back into the document.
    Write(TimerRecord),
    /// Erase the marker.
    Remove,
}

impl Transition {
    pub fn record(&self) -> Option<&TimerRecord> {
        match self {
            Self::Write(record) => Some(record),
            Self::Remove => None,
        }
    }
}

/// Precondition failures of the transition table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// `create` on a line that already carries a record.
    RecordExists(TimerId),
    /// Any non-create action without a prior record.
    MissingRecord { action: &'static str },
    /// Prior record is in the wrong state for the action.
    InvalidStatus {
        action: &'static str,
        id: TimerId,
        status: TimerStatus,
    },
}

impl Display for TransitionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RecordExists(id) => write!(f, "timer already exists: {id}"),
            Self::MissingRecord { action } => write!(f, "`{action}` requires an existing timer"),
            Self::InvalidStatus { action, id, status } => write!(
                f,
                "`{action}` is not allowed for timer {id} in status {}",
                status.as_str()
            ),
        }
    }
}

impl Error for TransitionError {}

/// Applies `action` to `prior` at epoch second `now`.
///
/// Crediting actions add `max(0, now - prior.anchor)` and move the anchor to
/// `now`. `create`, `continue`, `update` and `restore` stamp `session`;
/// `pause` and `forcepause` keep the prior stamp.
pub fn apply(
    action: &TimerAction,
    prior: Option<&TimerRecord>,
    now: i64,
    session: &SessionToken,
) -> Result<Transition, TransitionError> {
    let record = match (action, prior) {
        (TimerAction::Create(id), None) => {
            TimerRecord::new(id.clone(), TimerStatus::Running, 0, now).with_session(session.clone())
        }
        (TimerAction::Create(_), Some(old)) => {
            return Err(TransitionError::RecordExists(old.id.clone()));
        }
        (TimerAction::Delete, _) => return Ok(Transition::Remove),
        (_, None) => {
            return Err(TransitionError::MissingRecord {
                action: action.name(),
            });
        }
        (TimerAction::Continue, Some(old)) => {
            require_status(action, old, TimerStatus::Paused)?;
            TimerRecord::new(old.id.clone(), TimerStatus::Running, old.accumulated, now)
                .with_session(session.clone())
        }
        (TimerAction::Pause, Some(old)) => {
            require_status(action, old, TimerStatus::Running)?;
            TimerRecord {
                status: TimerStatus::Paused,
                accumulated: credited(old, now),
                anchor: now,
                ..old.clone()
            }
        }
        (TimerAction::Update | TimerAction::Restore, Some(old)) => {
            require_status(action, old, TimerStatus::Running)?;
            TimerRecord::new(old.id.clone(), TimerStatus::Running, credited(old, now), now)
                .with_session(session.clone())
        }
        (TimerAction::ForcePause, Some(old)) => {
            require_status(action, old, TimerStatus::Running)?;
            TimerRecord {
                status: TimerStatus::Paused,
                anchor: now,
                ..old.clone()
            }
        }
    };
    Ok(Transition::Write(record))
}

fn credited(old: &TimerRecord, now: i64) -> u64 {
    old.accumulated.saturating_add(old.elapsed_since_anchor(now))
}

fn require_status(
    action: &TimerAction,
    old: &TimerRecord,
    expected: TimerStatus,
) -> Result<(), TransitionError> {
    if old.status == expected {
        return Ok(());
    }
    Err(TransitionError::InvalidStatus {
        action: action.name(),
        id: old.id.clone(),
        status: old.status,
    })
}

#[cfg(test)]
mod tests {
    use super::{apply, TimerAction, Transition, TransitionError};
    use crate::model::session::SessionToken;
    use crate::model::timer::{TimerId, TimerRecord, TimerStatus};

    fn token() -> SessionToken {
        SessionToken::new("1700000000000")
    }

    fn written(transition: Transition) -> TimerRecord {
        match transition {
            Transition::Write(record) => record,
            Transition::Remove => panic!("expected a written record"),
        }
    }

    fn step(action: TimerAction, prior: &TimerRecord, now: i64) -> TimerRecord {
        written(apply(&action, Some(prior), now, &token()).expect("transition should apply"))
    }

    #[test]
    fn create_starts_running_at_zero() {
        let record = written(
            apply(&TimerAction::Create(TimerId::new("a")), None, 100, &token())
                .expect("create"),
        );
        assert_eq!(record.status, TimerStatus::Running);
        assert_eq!(record.accumulated, 0);
        assert_eq!(record.anchor, 100);
        assert_eq!(record.session, Some(token()));
    }

    #[test]
    fn create_over_existing_record_is_rejected() {
        let existing = TimerRecord::new("a", TimerStatus::Paused, 3, 0);
        let err = apply(
            &TimerAction::Create(TimerId::new("b")),
            Some(&existing),
            10,
            &token(),
        )
        .expect_err("create must require an empty line");
        assert_eq!(err, TransitionError::RecordExists(TimerId::new("a")));
    }

    #[test]
    fn updates_then_pause_credit_each_interval_once() {
        let created = written(
            apply(&TimerAction::Create(TimerId::new("a")), None, 0, &token()).expect("create"),
        );
        let paused = step(TimerAction::Pause, &created, 5);
        assert_eq!(paused.accumulated, 5);

        let resumed = step(TimerAction::Continue, &paused, 50);
        assert_eq!(resumed.accumulated, 5);
        let mut current = resumed;
        for now in [51, 52, 53] {
            current = step(TimerAction::Update, &current, now);
        }
        let paused = step(TimerAction::Pause, &current, 53);
        assert_eq!(paused.accumulated, 8);
        assert_eq!(paused.status, TimerStatus::Paused);
    }

    #[test]
    fn forcepause_never_credits_gap() {
        let stale = TimerRecord::new("a", TimerStatus::Running, 42, 1_000);
        let paused = step(TimerAction::ForcePause, &stale, 90_000);
        assert_eq!(paused.accumulated, 42);
        assert_eq!(paused.status, TimerStatus::Paused);
        assert_eq!(paused.anchor, 90_000);
    }

    #[test]
    fn restore_credits_gap() {
        let stale = TimerRecord::new("a", TimerStatus::Running, 42, 1_000);
        let restored = step(TimerAction::Restore, &stale, 1_060);
        assert_eq!(restored.accumulated, 102);
        assert_eq!(restored.status, TimerStatus::Running);
        assert_eq!(restored.session, Some(token()));
    }

    #[test]
    fn pause_keeps_prior_session_stamp() {
        let prior = TimerRecord::new("a", TimerStatus::Running, 0, 0)
            .with_session(SessionToken::new("older"));
        let paused = step(TimerAction::Pause, &prior, 1);
        assert_eq!(paused.session, Some(SessionToken::new("older")));
    }

    #[test]
    fn backwards_clock_does_not_reduce_accumulated() {
        let prior = TimerRecord::new("a", TimerStatus::Running, 10, 500);
        let updated = step(TimerAction::Update, &prior, 400);
        assert_eq!(updated.accumulated, 10);
    }

    #[test]
    fn wrong_status_is_rejected() {
        let paused = TimerRecord::new("a", TimerStatus::Paused, 1, 0);
        for action in [
            TimerAction::Pause,
            TimerAction::Update,
            TimerAction::Restore,
            TimerAction::ForcePause,
        ] {
            let err = apply(&action, Some(&paused), 5, &token()).expect_err("needs running");
            assert!(matches!(err, TransitionError::InvalidStatus { .. }));
        }

        let running = TimerRecord::new("a", TimerStatus::Running, 1, 0);
        let err = apply(&TimerAction::Continue, Some(&running), 5, &token())
            .expect_err("continue needs paused");
        assert!(matches!(err, TransitionError::InvalidStatus { .. }));
    }

    #[test]
    fn non_create_actions_need_prior_record() {
        let err = apply(&TimerAction::Pause, None, 1, &token()).expect_err("missing record");
        assert_eq!(err, TransitionError::MissingRecord { action: "pause" });
        assert_eq!(
            apply(&TimerAction::Delete, None, 1, &token()),
            Ok(Transition::Remove)
        );
    }
}
