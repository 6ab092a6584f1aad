//! Chunk aggregator
//!
//! Collects reader records into the line buffer and turns the buffer into
//! chunks: after `flush_interval` has passed since the last flush (checked
//! on a timer, so a quiet stream still gets flushed), and once more when
//! every reader has reached end of stream.

use rce_core::domain::job::ExitStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

use crate::error::SinkError;
use crate::service::log_buffer::{LineBuffer, render_chunk};
use crate::service::stream::StreamRecord;
use crate::sink::OutputSink;

/// Batches lines into cursor-ordered chunks
pub struct Aggregator {
    buffer: Arc<dyn LineBuffer>,
    sink: Box<dyn OutputSink>,
    flush_interval: Duration,
    cursor: u32,
    last_flush: Instant,
}

impl Aggregator {
    pub fn new(
        buffer: Arc<dyn LineBuffer>,
        sink: Box<dyn OutputSink>,
        flush_interval: Duration,
    ) -> Self {
        Self {
            buffer,
            sink,
            flush_interval,
            cursor: 0,
            last_flush: Instant::now(),
        }
    }

    /// Cursor the next chunk will be written at
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    /// Buffers a line outside of the reader queue
    pub fn push(&self, line: String) {
        self.buffer.push(line);
    }

    /// Consumes records until `streams` readers have ended, then flushes
    ///
    /// A closed queue (every sender gone) counts as the end of all streams.
    pub async fn collect(
        &mut self,
        rx: &mut mpsc::Receiver<StreamRecord>,
        streams: usize,
    ) -> Result<(), SinkError> {
        let mut ended = 0;

        while ended < streams {
            let due = self.last_flush + self.flush_interval;
            let pending = !self.buffer.is_empty();

            tokio::select! {
                record = rx.recv() => match record {
                    Some(StreamRecord::Line(line)) => self.buffer.push(line),
                    Some(StreamRecord::EndOfStream) => ended += 1,
                    None => break,
                },
                _ = tokio::time::sleep_until(due), if pending => {
                    self.flush().await?;
                }
            }
        }

        self.flush().await?;
        Ok(())
    }

    /// Writes buffered lines as the next chunk
    ///
    /// Returns whether a chunk was written. An all-blank buffer is dropped
    /// without advancing the cursor.
    pub async fn flush(&mut self) -> Result<bool, SinkError> {
        let lines = self.buffer.drain();
        let Some(chunk) = render_chunk(&lines) else {
            return Ok(false);
        };

        self.sink.write_chunk(self.cursor, &chunk).await?;
        debug!("Flushed chunk {} ({} lines)", self.cursor, lines.len());

        self.cursor += 1;
        self.last_flush = Instant::now();
        Ok(true)
    }

    /// Writes the exit record
    pub async fn finish(&mut self, status: ExitStatus) -> Result<(), SinkError> {
        self.sink.write_exit(status).await
    }
}
