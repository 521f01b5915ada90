pub mod history;
pub mod register;
mod reply;
pub mod stations;

pub use history::*;
pub use register::*;
pub use reply::StatusReply;
pub use stations::*;
