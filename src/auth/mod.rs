pub mod manager;
pub mod token;
