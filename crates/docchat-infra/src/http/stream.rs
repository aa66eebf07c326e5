//! Incremental UTF-8 decoding of streamed response bodies.
//!
//! Network chunks can split a multi-byte character; the decoder carries the
//! incomplete tail into the next chunk instead of emitting replacement
//! characters.

use std::fmt::Display;

use docchat_core::backend::ReplyStream;
use docchat_types::error::ClientError;
use futures_util::{Stream, StreamExt};

/// Stateful UTF-8 decoder for a byte stream.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Decode as much of `pending + chunk` as forms complete characters.
    /// Invalid sequences become U+FFFD; an incomplete trailing sequence is
    /// held back for the next call.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::new();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                        None => {
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush at end of stream; a dangling partial character becomes U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        tail
    }
}

/// Turn a body byte stream into a stream of text chunks.
pub fn text_stream<S, B, E>(body: S) -> ReplyStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    Box::pin(async_stream::try_stream! {
        let mut decoder = Utf8Decoder::default();
        let mut body = Box::pin(body);

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| ClientError::Stream(e.to_string()))?;
            let text = decoder.decode(chunk.as_ref());
            if !text.is_empty() {
                yield text;
            }
        }

        let tail = decoder.finish();
        if !tail.is_empty() {
            yield tail;
        }
    })
}
