//! Authentication: password hashing, signed tokens, session storage, and the
//! orchestration service that ties them together.

pub mod confirm;
pub mod current_user;
pub mod password;
pub mod service;
pub mod session;
pub mod store;
