//! SSE streaming endpoint.
//!
//! GET /api/streams/jobs/:id
//!
//! Subscribes to the job's StreamHub channel and forwards progress events as
//! SSE. Delivery is lossy: a slow consumer that overflows its buffer gets a
//! `lagged` event naming the gap and should re-sync via GET /api/status. The
//! job store remains the authoritative record either way.

use std::convert::Infallible;

use axum::extract::{Extension, Path};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, StreamExt};
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::common::ApiError;
use crate::server::app::AppState;

pub async fn job_stream(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl futures::Stream<Item = Result<Event, Infallible>>>, ApiError> {
    // Subscribing to a nonexistent job is a client error, not a silent
    // empty stream.
    state.store.get(id).await?;

    let rx = state.hub.subscribe(id).await;

    let connected =
        stream::once(async { Ok::<_, Infallible>(Event::default().event("connected").data("ok")) });

    let events = BroadcastStream::new(rx).filter_map(|result| async {
        match result {
            Ok(value) => {
                let event_name = value
                    .get("event_type")
                    .and_then(|t| t.as_str())
                    .unwrap_or("message");
                Event::default()
                    .event(event_name)
                    .json_data(&value)
                    .ok()
                    .map(Ok)
            }
            Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(n)) => {
                Event::default()
                    .event("lagged")
                    .json_data(&serde_json::json!({ "missed": n }))
                    .ok()
                    .map(Ok)
            }
        }
    });

    Ok(Sse::new(connected.chain(events)).keep_alive(KeepAlive::default()))
}
