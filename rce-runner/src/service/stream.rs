//! Output stream readers
//!
//! One reader task per child stream. Each sends the stream's lines, in
//! order, followed by exactly one `EndOfStream`.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Record sent by a stream reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamRecord {
    /// One line without its terminator
    Line(String),
    /// The stream is closed
    EndOfStream,
}

/// Spawns a task that reads `reader` line by line into `tx`
///
/// Invalid UTF-8 is replaced lossily. A final line without a trailing
/// newline is still delivered. A read error ends the stream.
pub fn spawn_reader<R>(
    name: &'static str,
    reader: R,
    tx: mpsc::Sender<StreamRecord>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        let mut count = 0usize;

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    strip_terminator(&mut buf);
                    let line = String::from_utf8_lossy(&buf).into_owned();
                    if tx.send(StreamRecord::Line(line)).await.is_err() {
                        return;
                    }
                    count += 1;
                }
                Err(e) => {
                    warn!("Error reading {}: {}", name, e);
                    break;
                }
            }
        }

        debug!("{} closed after {} line(s)", name, count);
        let _ = tx.send(StreamRecord::EndOfStream).await;
    })
}

fn strip_terminator(buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(input: &'static [u8]) -> Vec<StreamRecord> {
        let (tx, mut rx) = mpsc::channel(16);
        spawn_reader("test", input, tx);

        let mut records = Vec::new();
        while let Some(record) = rx.recv().await {
            records.push(record);
        }
        records
    }

    #[tokio::test]
    async fn test_lines_then_end_of_stream() {
        let records = collect(b"one\ntwo\r\n\nthree").await;
        assert_eq!(
            records,
            vec![
                StreamRecord::Line("one".to_string()),
                StreamRecord::Line("two".to_string()),
                StreamRecord::Line(String::new()),
                StreamRecord::Line("three".to_string()),
                StreamRecord::EndOfStream,
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_stream_only_ends() {
        assert_eq!(collect(b"").await, vec![StreamRecord::EndOfStream]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_lossy() {
        let records = collect(b"ok\xff\n").await;
        assert_eq!(
            records[0],
            StreamRecord::Line("ok\u{fffd}".to_string())
        );
    }
}
