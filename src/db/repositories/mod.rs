pub mod agenda_items;
pub mod decisions;
pub mod meetings;
