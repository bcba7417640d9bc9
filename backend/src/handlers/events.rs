//! Server-Sent Events stream of farm data changes

use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream};
use serde::Deserialize;
use uuid::Uuid;

use crate::services::ChangeTable;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ChangeStreamQuery {
    pub table: Option<ChangeTable>,
}

/// Stream a `changed` event whenever the farm's data changes.
///
/// Clients refetch whatever they display on every event.
pub async fn stream_changes(
    State(state): State<AppState>,
    Path(farm_id): Path<Uuid>,
    Query(query): Query<ChangeStreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.changes.subscribe(farm_id, query.table);
    tracing::debug!("Change stream opened for farm {}", farm_id);

    let events = stream::unfold(subscription, |mut subscription| async move {
        let change = subscription.next().await?;
        let event = Event::default()
            .event("changed")
            .json_data(change)
            .unwrap_or_else(|_| Event::default().event("changed"));
        Some((Ok(event), subscription))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
