pub mod agenda_item;
pub mod decision;
pub mod meeting;

pub use agenda_item::{AgendaItem, AgendaPatch, AgendaStatus};
pub use decision::{DecisionKind, OverrunDecision};
pub use meeting::{AgendaItemSummary, Meeting, MeetingPatch, MeetingStatus, MeetingSummary};
