pub mod attendance;
pub mod leave_request;

#[cfg(test)]
mod tests;
