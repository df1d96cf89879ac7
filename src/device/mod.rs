pub mod session;
pub mod zk_session;

#[cfg(test)]
pub mod fake;
