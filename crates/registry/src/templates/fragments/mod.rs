mod history_table;
mod notice;
mod station_table;

pub use history_table::history_table;
pub use notice::error_notice;
pub use station_table::station_table;
