pub mod booking;
pub mod business;
pub mod calendar;
pub mod slot;
