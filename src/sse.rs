use crate::error::{DecodeError, TransportError};
use crate::protocol::StreamChunk;
use crate::transport::StreamHandle;
use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use tracing::warn;

const FRAME_DELIMITER: &str = "\n\n";
const PAYLOAD_PREFIX: &str = "data:";

/// Incremental decoder for `data: {"chunk": ...}` event frames.
///
/// Fragments may split a frame (or its delimiter) anywhere; the unterminated
/// tail is carried into the next call.
#[derive(Debug, Default)]
pub struct SseDecoder {
    carry: String,
}

impl SseDecoder {
    /// Feed one fragment and drain the chunks of every frame it completes.
    pub fn feed(&mut self, fragment: &str) -> Vec<StreamChunk> {
        self.carry.push_str(fragment);
        let mut chunks = Vec::new();

        while let Some(split) = self.carry.find(FRAME_DELIMITER) {
            let frame: String = self.carry.drain(..split + FRAME_DELIMITER.len()).collect();
            match decode_frame(&frame[..split]) {
                Some(Ok(chunk)) => chunks.push(chunk),
                Some(Err(err)) => warn!(error = %err, "dropping malformed stream frame"),
                None => {}
            }
        }

        chunks
    }

    /// The unterminated tail awaiting its delimiter.
    pub fn pending(&self) -> &str {
        &self.carry
    }
}

/// `None` for frames that carry no payload.
pub fn decode_frame(frame: &str) -> Option<Result<StreamChunk, DecodeError>> {
    let payload = frame.strip_prefix(PAYLOAD_PREFIX)?.trim();
    Some(
        serde_json::from_str(payload).map_err(|source| DecodeError {
            frame: frame.to_string(),
            source,
        }),
    )
}

/// Decode a fragment stream into chunks. Transport errors end the stream after
/// being yielded; a trailing partial frame at end-of-stream is dropped.
pub fn decode_stream(
    fragments: StreamHandle,
) -> impl Stream<Item = Result<StreamChunk, TransportError>> + Send {
    struct State {
        fragments: StreamHandle,
        decoder: SseDecoder,
        ready: VecDeque<StreamChunk>,
        done: bool,
    }

    let state = State {
        fragments,
        decoder: SseDecoder::default(),
        ready: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(chunk) = state.ready.pop_front() {
                return Some((Ok(chunk), state));
            }
            if state.done {
                return None;
            }
            match state.fragments.next().await {
                Some(Ok(fragment)) => state.ready.extend(state.decoder.feed(&fragment)),
                Some(Err(err)) => {
                    state.done = true;
                    return Some((Err(err), state));
                }
                None => {
                    if !state.decoder.pending().is_empty() {
                        warn!(
                            pending = state.decoder.pending().len(),
                            "stream ended inside a frame; dropping tail"
                        );
                    }
                    return None;
                }
            }
        }
    })
}
