pub mod sqlite_booking_repo;
pub mod sqlite_business_repo;

pub mod postgres_booking_repo;
pub mod postgres_business_repo;
