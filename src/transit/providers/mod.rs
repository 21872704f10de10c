pub mod http;
pub mod preferences;
pub mod timetable;

pub use http::HttpTransitSource;
pub use preferences::FilePreferences;
pub use timetable::TimetableSource;
