pub mod device;
pub mod response;
pub mod user;
