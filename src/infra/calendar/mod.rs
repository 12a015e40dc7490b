pub mod http_calendar_provider;
pub mod registry;
