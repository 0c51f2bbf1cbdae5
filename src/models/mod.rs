pub mod event;
pub mod event_log;

pub use event::{Event, EventState, LastResponse};
pub use event_log::{Change, EventLog, Failure, LogContent, NewEventLog, PathSegment};
