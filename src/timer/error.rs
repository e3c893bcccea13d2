use serde::Serialize;
use thiserror::Error;

/// Expected, recoverable reasons a run-clock command is refused.
///
/// A refused command leaves the meeting untouched. Callers surface
/// [`ClockError::reason`] to the user.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClockError {
    #[error("no meeting is selected")]
    NoActiveMeeting,
    #[error("no agenda item is current")]
    NoCurrentAgenda,
    #[error("agenda item no longer exists")]
    AgendaNotFound,
    #[error("source agenda item no longer exists")]
    FromNotFound,
    #[error("current agenda item is the last one")]
    NoNextAgenda,
    #[error("next agenda item does not have enough planned time")]
    NegativeNext,
    #[error("amount must be greater than zero")]
    InvalidAmount,
}

impl ClockError {
    pub fn reason(&self) -> &'static str {
        match self {
            ClockError::NoActiveMeeting => "no-active-meeting",
            ClockError::NoCurrentAgenda => "no-current-agenda",
            ClockError::AgendaNotFound => "agenda-not-found",
            ClockError::FromNotFound => "from-not-found",
            ClockError::NoNextAgenda => "no-next-agenda",
            ClockError::NegativeNext => "negative-next",
            ClockError::InvalidAmount => "invalid-amount",
        }
    }
}

pub type ClockResult<T = ()> = Result<T, ClockError>;
