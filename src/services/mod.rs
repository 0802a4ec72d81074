pub mod attendance;
pub mod leave;
pub mod overlap;
pub mod stats;
