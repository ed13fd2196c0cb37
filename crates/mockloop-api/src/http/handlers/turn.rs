//! Turn endpoints, buffered and streamed.
//!
//! POST /api/v1/interviews/{id}/turns         - Submit one turn
//! POST /api/v1/interviews/{id}/turns/stream  - Submit one turn as SSE
//!
//! SSE event types:
//! - `delta` - raw backend text: `{ "text": "..." }`
//! - `turn`  - the committed turn outcome
//! - `done`  - stream complete: `{}`
//! - `error` - the turn failed: `{ "message": "..." }`
//!
//! Exactly one of `done` or `error` ends the stream.

use std::convert::Infallible;
use std::time::{Duration, Instant};

use axum::Json;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::{StreamExt, future};
use serde::Serialize;
use tokio_stream::Stream;

use mockloop_core::interview::stream::TurnFragment;
use mockloop_types::interview::{TurnInput, TurnOutcome};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// POST /api/v1/interviews/{id}/turns
pub async fn submit_turn(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<TurnInput>,
) -> Result<Json<ApiResponse<TurnOutcome>>, AppError> {
    let start = Instant::now();
    let outcome = state.interview_service.submit_turn(id, input).await?;

    let mut resp = ApiResponse::success(outcome, start)
        .with_link("interview", &format!("/api/v1/interviews/{id}"));
    if resp.data.as_ref().is_some_and(|o| o.need_end) {
        resp = resp.with_link("end", &format!("/api/v1/interviews/{id}/end"));
    }
    Ok(Json(resp))
}

/// POST /api/v1/interviews/{id}/turns/stream
///
/// Failures are reported in-band as an `error` event; the HTTP status is
/// always 200 once the stream starts.
pub async fn stream_turn(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<TurnInput>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let fragments = state.interview_service.submit_turn_stream(id, input);
    Sse::new(sse_events(fragments)).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

/// Map turn fragments to SSE events, ending the stream after the first
/// event that could not be encoded.
fn sse_events<S>(fragments: S) -> impl Stream<Item = Result<Event, Infallible>>
where
    S: Stream<Item = TurnFragment>,
{
    fragments.scan(false, |failed, fragment| {
        let next = if *failed {
            None
        } else {
            match fragment_event(fragment) {
                Ok(event) => Some(Ok(event)),
                Err(event) => {
                    *failed = true;
                    Some(Ok(event))
                }
            }
        };
        future::ready(next)
    })
}

/// `Err` carries the `error` event that replaces an unencodable payload.
fn fragment_event(fragment: TurnFragment) -> Result<Event, Event> {
    match fragment {
        TurnFragment::Delta(text) => json_event("delta", &serde_json::json!({ "text": text })),
        TurnFragment::Completed(outcome) => json_event("turn", &outcome),
        TurnFragment::End => Ok(Event::default().event("done").data("{}")),
        TurnFragment::Error(message) => Ok(error_event(&message)),
    }
}

fn json_event<T: Serialize>(name: &str, payload: &T) -> Result<Event, Event> {
    match serde_json::to_string(payload) {
        Ok(data) => Ok(Event::default().event(name).data(data)),
        Err(e) => {
            tracing::error!(event = name, error = %e, "could not encode SSE payload");
            Err(error_event(&format!("could not encode {name} event: {e}")))
        }
    }
}

fn error_event(message: &str) -> Event {
    Event::default()
        .event("error")
        .data(serde_json::json!({ "message": message }).to_string())
}
