use crate::db::models::{AgendaItemSummary, DecisionKind, Meeting, MeetingSummary};

impl MeetingSummary {
    pub fn from_meeting(meeting: &Meeting) -> Self {
        let items = meeting
            .agenda
            .iter()
            .map(|item| {
                let count = |kind: DecisionKind| {
                    item.overrun_decisions
                        .iter()
                        .filter(|decision| decision.kind == kind)
                        .count()
                };
                AgendaItemSummary {
                    id: item.id.clone(),
                    title: item.title.clone(),
                    planned_duration: item.planned_duration,
                    actual_duration: item.actual_duration,
                    overrun_sec: item.overrun_sec(),
                    extend_count: count(DecisionKind::Extend),
                    borrow_count: count(DecisionKind::Borrow),
                    skipped: count(DecisionKind::Next) > 0,
                }
            })
            .collect();

        Self {
            id: meeting.id.clone(),
            title: meeting.title.clone(),
            status: meeting.status,
            total_planned: meeting.total_planned(),
            total_actual: meeting.total_actual(),
            items,
        }
    }
}
