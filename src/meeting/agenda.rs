//! Agenda editing.
//!
//! Every structural edit ends with [`Meeting::renumber`], so `order` is always
//! exactly `0..len` and matches the position in `agenda`.

use chrono::Utc;

use crate::db::models::{AgendaItem, Meeting};
use crate::timer::{ClockError, ClockResult};

impl Meeting {
    /// Appends a pending item at the end of the agenda.
    pub fn add_item(&mut self, title: impl Into<String>, planned_duration: u64) -> AgendaItem {
        let order = self.agenda.len() as u32;
        let item = AgendaItem::new(&self.id, title, order, planned_duration);
        self.agenda.push(item.clone());
        self.touch();
        item
    }

    /// Inserts a pending item at `index` (clamped to the agenda length).
    pub fn insert_item(
        &mut self,
        index: usize,
        title: impl Into<String>,
        planned_duration: u64,
    ) -> AgendaItem {
        let index = index.min(self.agenda.len());
        let item = AgendaItem::new(&self.id, title, index as u32, planned_duration);
        self.agenda.insert(index, item);
        self.renumber();
        self.agenda[index].clone()
    }

    pub fn remove_item(&mut self, agenda_id: &str) -> ClockResult<AgendaItem> {
        let index = self.position(agenda_id).ok_or(ClockError::AgendaNotFound)?;
        let removed = self.agenda.remove(index);
        self.renumber();
        Ok(removed)
    }

    /// Moves an item to `new_index` (clamped), shifting the items in between.
    pub fn move_item(&mut self, agenda_id: &str, new_index: usize) -> ClockResult {
        let index = self.position(agenda_id).ok_or(ClockError::AgendaNotFound)?;
        let item = self.agenda.remove(index);
        let new_index = new_index.min(self.agenda.len());
        self.agenda.insert(new_index, item);
        self.renumber();
        Ok(())
    }

    pub fn rename_item(&mut self, agenda_id: &str, title: impl Into<String>) -> ClockResult {
        let item = self.item_mut(agenda_id).ok_or(ClockError::AgendaNotFound)?;
        item.title = title.into();
        self.touch();
        Ok(())
    }

    /// Restores `agenda` to ascending `order` and rewrites `order` as `0..len`.
    pub fn renumber(&mut self) {
        for (index, item) in self.agenda.iter_mut().enumerate() {
            item.order = index as u32;
        }
        self.touch();
    }

    /// Sorts by stored `order` (ties keep their relative position) then renumbers.
    /// Used when loading rows whose orders may have gaps.
    pub fn normalize_order(&mut self) {
        self.agenda.sort_by_key(|item| item.order);
        self.renumber();
    }

    pub fn total_planned(&self) -> u64 {
        self.agenda.iter().map(|item| item.planned_duration).sum()
    }

    pub fn total_actual(&self) -> u64 {
        self.agenda.iter().map(|item| item.actual_duration).sum()
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
