pub mod lookup;
pub mod server;
