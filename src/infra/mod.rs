pub mod calendar;
pub mod factory;
pub mod repositories;
