use chrono_tz::Tz;
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};

use crate::core::state::UiState;
use crate::transit::StopRef;
use crate::tui::component::Component;
use crate::tui::components::{NavBar, TitleBar, TripView};

/// Everything a frame needs besides the controller's state.
pub struct FrameProps<'a> {
    pub stop: &'a StopRef,
    pub zone: Tz,
    pub favorite: Option<bool>,
    pub spinner_frame: usize,
}

pub fn draw_ui(frame: &mut Frame, state: &UiState, props: &FrameProps) {
    use Constraint::{Length, Min};
    let layout = Layout::vertical([Length(1), Min(0), Length(3)]);
    let [title_area, main_area, nav_area] = layout.areas(frame.area());

    // The stop name arrives asynchronously; show its reference until then
    let stop_label = state
        .stop
        .as_ref()
        .map(|stop| stop.name.clone())
        .unwrap_or_else(|| props.stop.to_string());
    let reference = state
        .reference_date_time
        .with_timezone(&props.zone)
        .format("%a %d %b %H:%M")
        .to_string();
    TitleBar::new(stop_label, props.favorite, reference).render(frame, title_area);

    TripView {
        trip: state.trip.clone(),
        trip_index: state.trip_index,
        stop_id: props.stop.id.clone(),
        zone: props.zone,
        loading: state.loading,
        error: state.error,
    }
    .render(frame, main_area);

    NavBar {
        prev_enabled: state.prev_enabled,
        next_enabled: state.next_enabled,
        loading: state.loading,
        error: state.error,
        has_trip: state.trip.is_some(),
        spinner_frame: props.spinner_frame,
    }
    .render(frame, nav_area);
}
