pub mod delimited;
pub mod event_logs;
pub mod events;
pub mod text;
