mod protocol;
pub mod routes;
mod server;

pub use protocol::*;
pub use server::*;
