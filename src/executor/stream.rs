// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Byte stream to channel adapter.
//!
//! [`stream_to_channels`] turns any [`AsyncRead`] into a channel of text
//! chunks plus a channel carrying at most one read error. Chunks are
//! whatever a single read returned (up to [`CHUNK_SIZE`] bytes), not lines.
//! Both channels have a capacity of one, so a slow consumer slows the read
//! loop down instead of losing data.

use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;

/// Maximum number of bytes read per chunk.
pub const CHUNK_SIZE: usize = 4096;

/// Spawn a reader task for `reader` and return its data and error channels.
///
/// On end-of-stream both channels close without an error. On a read failure
/// exactly one error is sent, then both channels close and the reader is not
/// touched again.
pub fn stream_to_channels<R>(reader: R) -> (mpsc::Receiver<String>, mpsc::Receiver<io::Error>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (data_tx, data_rx) = mpsc::channel(1);
    let (error_tx, error_rx) = mpsc::channel(1);

    tokio::spawn(async move {
        let mut reader = reader;
        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut decoder = Utf8Decoder::default();

        loop {
            match reader.read(&mut buffer).await {
                Ok(0) => break,
                Ok(n) => {
                    if let Some(text) = decoder.push(&buffer[..n]) {
                        if data_tx.send(text).await.is_err() {
                            // Consumer is gone, nobody will see further chunks
                            return;
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    if let Some(rest) = decoder.finish() {
                        let _ = data_tx.send(rest).await;
                    }
                    tracing::debug!("Stream read failed: {}", e);
                    let _ = error_tx.send(e).await;
                    return;
                }
            }
        }

        if let Some(rest) = decoder.finish() {
            let _ = data_tx.send(rest).await;
        }
    });

    (data_rx, error_rx)
}

/// Drain a chunk channel into one string.
pub async fn collect_chunks(mut chunks: mpsc::Receiver<String>) -> String {
    let mut text = String::new();
    while let Some(chunk) = chunks.recv().await {
        text.push_str(&chunk);
    }
    text
}

/// Incremental UTF-8 decoding across read boundaries.
///
/// A multi-byte sequence cut by a read boundary is held back until the next
/// read completes it. Invalid sequences are replaced with U+FFFD.
#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn push(&mut self, bytes: &[u8]) -> Option<String> {
        self.pending.extend_from_slice(bytes);
        let split = incomplete_suffix_start(&self.pending);
        let held_back = self.pending.split_off(split);
        let complete = std::mem::replace(&mut self.pending, held_back);

        if complete.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&complete).into_owned())
        }
    }

    fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            let rest = std::mem::take(&mut self.pending);
            Some(String::from_utf8_lossy(&rest).into_owned())
        }
    }
}

/// Index at which a trailing, not yet complete UTF-8 sequence starts.
///
/// Returns `bytes.len()` when the buffer ends on a sequence boundary.
fn incomplete_suffix_start(bytes: &[u8]) -> usize {
    let len = bytes.len();
    for back in 1..=len.min(3) {
        let byte = bytes[len - back];
        if byte & 0b1100_0000 == 0b1000_0000 {
            // continuation byte, keep looking for the lead byte
            continue;
        }
        let needed = if byte & 0b1110_0000 == 0b1100_0000 {
            2
        } else if byte & 0b1111_0000 == 0b1110_0000 {
            3
        } else if byte & 0b1111_1000 == 0b1111_0000 {
            4
        } else {
            1
        };
        return if needed > back { len - back } else { len };
    }
    len
}
