pub mod controller;
pub mod error;
pub mod notify;
pub mod run_clock;
pub mod state;

pub use controller::{ControllerOptions, TimerController};
pub use error::{ClockError, ClockResult};
pub use notify::{FanoutNotifier, LogNotifier, Notification, NotificationKind, Notifier};
pub use run_clock::{ClockEvent, RunClock, RunClockSnapshot};
pub use state::RunClockState;
