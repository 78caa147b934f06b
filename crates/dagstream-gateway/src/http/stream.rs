//! SSE endpoint, GET /stream.
//!
//! Each connection gets its own hub subscription. Every broadcast message is
//! forwarded verbatim as one `message` event. When the client goes away axum
//! drops the response stream, and with it the subscription, which drains the
//! mailbox and unregisters it from the hub.

use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures_util::Stream;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::app::AppState;

const EVENT_NAME: &str = "message";

pub async fn stream_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, Json<Value>)> {
    let mut subscription = state.hub.subscribe().await.map_err(|e| {
        warn!(error = %e, "cannot subscribe SSE client");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": e.to_string() })),
        )
    })?;
    info!(subscriber = %subscription.id(), "SSE client connected");

    let stream = async_stream::stream! {
        while let Some(message) = subscription.recv().await {
            yield Ok(to_event(&message));
        }
        info!(subscriber = %subscription.id(), "hub closed SSE stream");
    };

    let keep_alive = KeepAlive::new().interval(Duration::from_secs(
        state.config.gateway.keep_alive_secs.max(1),
    ));
    Ok(Sse::new(stream).keep_alive(keep_alive))
}

/// Wrap one hub message as an SSE event.
///
/// SSE framing cannot carry bare carriage returns, so line endings are
/// normalised to `\n`; each line becomes its own `data:` field.
fn to_event(message: &str) -> Event {
    let event = Event::default().event(EVENT_NAME);
    if message.contains('\r') {
        event.data(message.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        event.data(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    /// Frame a single event the way the endpoint does and return the body.
    async fn render(message: &str) -> String {
        let events = futures_util::stream::iter([Ok::<_, Infallible>(to_event(message))]);
        let body = Sse::new(events).into_response().into_body();
        let bytes = axum::body::to_bytes(body, 64 * 1024).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn data_lines(frame: &str) -> Vec<&str> {
        frame
            .lines()
            .filter_map(|l| l.strip_prefix("data: "))
            .collect()
    }

    #[tokio::test]
    async fn plain_message_is_forwarded_verbatim() {
        let payload = r#"{"type":"state","state_data":{"resdata":{"dag":{}}}}"#;
        let frame = render(payload).await;

        assert!(frame.contains("event: message\n"));
        assert_eq!(data_lines(&frame), vec![payload]);
        assert!(frame.ends_with("\n\n"));
    }

    #[tokio::test]
    async fn carriage_returns_become_separate_data_lines() {
        let frame = render("line one\r\nline two\rline three").await;

        assert!(!frame.contains('\r'));
        assert_eq!(
            data_lines(&frame),
            vec!["line one", "line two", "line three"]
        );
    }
}
