mod agenda;
mod summary;

pub use crate::db::models::{Meeting, MeetingStatus, MeetingSummary};
