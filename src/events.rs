use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{stream::BoxStream, StreamExt};
use serde::Serialize;
use tracing::warn;

use crate::cache::LiveQuery;

pub type EventStream = Sse<BoxStream<'static, Result<Event, Infallible>>>;

/// Streams every emission of a live query as a named server-sent event.
/// Cache failures become `error` events; the stream stays open.
pub fn live_events<T>(name: &'static str, query: LiveQuery<T>) -> EventStream
where
    T: Serialize + Send + 'static,
{
    let events = query
        .map(move |item| {
            let event = match item {
                Ok(value) => Event::default().event(name).json_data(&value),
                Err(e) => {
                    warn!(error = %e, stream = name, "live query failed");
                    Ok(Event::default().event("error").data(e.to_string()))
                }
            };
            Ok(event.unwrap_or_else(|e| Event::default().event("error").data(e.to_string())))
        })
        .boxed();
    Sse::new(events).keep_alive(KeepAlive::default())
}
