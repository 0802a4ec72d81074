pub mod clock;
pub mod date_range;
pub mod employee_cache;
