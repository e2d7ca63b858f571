pub mod access;
pub mod session;
