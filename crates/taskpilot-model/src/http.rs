//! Plumbing shared by the HTTP backends.

use reqwest::Response;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::error::ModelError;
use crate::sse::{SseDecoder, DONE_SENTINEL};
use crate::types::ModelChunk;
use crate::ChunkStream;

/// Buffered chunks between the body reader and the consumer.
const CHUNK_BUFFER: usize = 32;

/// Turn a non-2xx response into [`ModelError::Status`].
pub(crate) async fn check_status(response: Response) -> Result<Response, ModelError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), "Model backend returned an error status");
    Err(ModelError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Read an SSE body on a background task and expose it as a chunk stream.
///
/// `extract` pulls the text fragment out of each decoded JSON payload. The
/// stream ends at `[DONE]` or end of body; the reader stops early when the
/// consumer drops the stream.
pub(crate) fn spawn_sse_reader<F>(response: Response, extract: F) -> ChunkStream
where
    F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::channel(CHUNK_BUFFER);

    tokio::spawn(async move {
        let mut body = response.bytes_stream();
        let mut decoder = SseDecoder::new();

        while let Some(next) = body.next().await {
            let bytes = match next {
                Ok(bytes) => bytes,
                Err(e) => {
                    let _ = tx.send(Err(ModelError::Stream(e.to_string()))).await;
                    return;
                }
            };
            for payload in decoder.push(&bytes) {
                if !forward(&payload, &tx, &extract).await {
                    return;
                }
            }
        }

        if let Some(payload) = decoder.finish() {
            forward(&payload, &tx, &extract).await;
        }
    });

    Box::pin(ReceiverStream::new(rx))
}

/// Send one payload downstream. Returns `false` when reading should stop.
async fn forward<F>(
    payload: &str,
    tx: &mpsc::Sender<Result<ModelChunk, ModelError>>,
    extract: &F,
) -> bool
where
    F: Fn(&Value) -> Option<String>,
{
    if payload == DONE_SENTINEL {
        return false;
    }

    let item = match serde_json::from_str::<Value>(payload) {
        Ok(value) => Ok(ModelChunk {
            response: extract(&value),
        }),
        Err(e) => Err(ModelError::Decode(format!("bad stream payload: {}", e))),
    };
    let is_err = item.is_err();

    if tx.send(item).await.is_err() {
        debug!("Stream consumer dropped, stopping body reader");
        return false;
    }
    !is_err
}
