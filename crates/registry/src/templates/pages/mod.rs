pub mod history;
pub mod stations;

pub use history::history_page;
pub use stations::station_listing_page;
