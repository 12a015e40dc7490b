pub mod booking;
pub mod business;
pub mod health;
pub mod webhook;
