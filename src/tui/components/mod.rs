//! # TUI Components
//!
//! Stateless, props-based components. Each receives everything it draws as
//! struct fields and renders into the area it is given:
//!
//! - `TitleBar`: stop name, favorite star and reference time
//! - `TripView`: the displayed trip and its calls
//! - `NavBar`: key hints and the status of the current operation
//!
//! ```text
//! components/
//! ├── mod.rs           (this file)
//! ├── title_bar.rs     (Top status bar)
//! ├── trip_view.rs     (Trip and its calls)
//! └── nav_bar.rs       (Hints and status)
//! ```

mod nav_bar;
mod title_bar;
mod trip_view;

pub use nav_bar::NavBar;
pub use title_bar::TitleBar;
pub use trip_view::TripView;
