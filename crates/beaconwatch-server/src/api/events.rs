//! Server-sent snapshot stream.
//!
//! Each client receives the current beacon list first, then one `beacons`
//! event every time the coordinator publishes a new snapshot. Intermediate
//! snapshots may be coalesced for slow clients; the last one always arrives.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use beaconwatch_core::{BeaconListView, TrackedSnapshot};
use futures::stream::{self, Stream};
use tokio::sync::watch;
use tracing::warn;

use crate::state::SharedState;

/// SSE event name carrying a [`BeaconListView`].
pub const BEACONS_EVENT: &str = "beacons";

/// Stream beacon list updates.
#[utoipa::path(
    get,
    path = "/api/events",
    tag = "beacons",
    operation_id = "streamBeacons",
    summary = "Stream beacon list updates",
    description = "Server-sent events. Every `beacons` event carries the full beacon \
        list view. The current view is sent immediately on connect.",
    responses(
        (status = 200, description = "Event stream", content_type = "text/event-stream", body = BeaconListView)
    )
)]
pub async fn stream_events(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(snapshot_events(state.coordinator.subscribe())).keep_alive(KeepAlive::default())
}

fn snapshot_events(
    updates: watch::Receiver<TrackedSnapshot>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold((updates, true), |(mut updates, first)| async move {
        if !first && updates.changed().await.is_err() {
            return None;
        }
        let view = BeaconListView::render(&updates.borrow_and_update());
        Some((Ok(render_event(&view)), (updates, false)))
    })
}

fn render_event(view: &BeaconListView) -> Event {
    Event::default()
        .event(BEACONS_EVENT)
        .json_data(view)
        .unwrap_or_else(|e| {
            warn!(error = %e, "Failed to encode beacon list event");
            Event::default().comment("encoding failed")
        })
}
