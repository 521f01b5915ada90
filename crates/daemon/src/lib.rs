mod trigger;
mod utils;

pub use trigger::*;
pub use utils::*;
