// Chunked NDJSON streaming of live chart updates
use crate::domain::window::LiveUpdate;
use axum::body::Body;
use axum::http::{Response, StatusCode, header};
use axum::response::IntoResponse;
use bytes::{BufMut, Bytes, BytesMut};
use futures::StreamExt;
use futures::stream::Stream;

/// Create a chunked response with one JSON document per line
pub fn ndjson_stream<S>(stream: S) -> Result<Response<Body>, StatusCode>
where
    S: Stream<Item = LiveUpdate> + Send + 'static,
{
    let byte_stream = stream.map(serialize_line);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(byte_stream))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Serialize a single update as a newline-terminated chunk
fn serialize_line(update: LiveUpdate) -> Result<Bytes, serde_json::Error> {
    let json = serde_json::to_vec(&update)?;
    let mut chunk = BytesMut::with_capacity(json.len() + 1);
    chunk.put_slice(&json);
    chunk.put_u8(b'\n');
    Ok(chunk.freeze())
}

/// Helper to create a streaming response from a receiver
pub fn stream_from_receiver(
    mut rx: tokio::sync::mpsc::Receiver<LiveUpdate>,
) -> impl IntoResponse {
    let stream = async_stream::stream! {
        while let Some(update) = rx.recv().await {
            yield update;
        }
    };

    match ndjson_stream(stream) {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::window::{LiveState, WindowState};

    #[test]
    fn test_serialize_line() {
        let update = LiveUpdate {
            state: LiveState::Running,
            window: WindowState::default(),
            planned: vec![],
            actual: vec![],
            pending: 2,
        };
        let chunk = serialize_line(update).unwrap();

        assert_eq!(chunk.last(), Some(&b'\n'));
        let value: serde_json::Value = serde_json::from_slice(&chunk[..chunk.len() - 1]).unwrap();
        assert_eq!(value["state"], "running");
        assert_eq!(value["pending"], 2);
        assert_eq!(value["window"]["trailing_seconds"], 5.0);
    }
}
