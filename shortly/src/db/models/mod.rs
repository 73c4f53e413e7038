pub mod links;
pub mod users;
