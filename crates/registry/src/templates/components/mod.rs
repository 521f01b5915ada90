mod navbar;

pub use navbar::navbar;
