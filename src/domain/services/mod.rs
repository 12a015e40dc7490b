pub mod assistant;
pub mod availability;
pub mod booking_lifecycle;
pub mod business_hours;
pub mod intent;
pub mod retry;
