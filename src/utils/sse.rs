//! Bounded reader for Chat-shape SSE `data:` frames.

use futures_util::stream::{self, BoxStream};
use futures_util::Stream;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::io::StreamReader;

use crate::{CompatError, Result};

/// Terminal sentinel sent by chat backends after the last chunk.
pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SseLimits {
    pub max_line_bytes: usize,
    pub max_event_bytes: usize,
}

impl Default for SseLimits {
    fn default() -> Self {
        Self {
            max_line_bytes: 256 * 1024,
            max_event_bytes: 4 * 1024 * 1024,
        }
    }
}

/// Pulls one `data:` payload at a time out of an SSE byte source.
///
/// Multi-line payloads are joined with `\n`. Other fields (`event:`, `id:`,
/// comments) are skipped. `[DONE]` and end of input both end the frames.
pub struct SseDataReader<R> {
    reader: R,
    limits: SseLimits,
    line: Vec<u8>,
    data: String,
    finished: bool,
}

impl<R> SseDataReader<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R, limits: SseLimits) -> Self {
        Self {
            reader,
            limits,
            line: Vec::new(),
            data: String::new(),
            finished: false,
        }
    }

    /// Reads one line into `self.line`. Returns `false` at end of input.
    async fn read_line(&mut self) -> Result<bool> {
        let max_bytes = self.limits.max_line_bytes;
        self.line.clear();
        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                return Ok(!self.line.is_empty());
            }

            let newline = buf.iter().position(|b| *b == b'\n');
            let take = newline.map_or(buf.len(), |pos| pos + 1);
            if self.line.len().saturating_add(take) > max_bytes {
                return Err(CompatError::Sse(format!(
                    "line exceeds max_line_bytes={max_bytes}"
                )));
            }
            self.line.extend_from_slice(&buf[..take]);
            self.reader.consume(take);

            if newline.is_some() {
                return Ok(true);
            }
        }
    }

    fn take_frame(&mut self) -> Option<String> {
        let data = std::mem::take(&mut self.data);
        if data == DONE_SENTINEL {
            self.finished = true;
            return None;
        }
        Some(data)
    }

    pub async fn next_data(&mut self) -> Result<Option<String>> {
        if self.limits.max_line_bytes == 0 || self.limits.max_event_bytes == 0 {
            return Err(CompatError::Sse("SSE limits must be > 0".to_string()));
        }
        if self.finished {
            return Ok(None);
        }
        self.data.clear();

        loop {
            if !self.read_line().await? {
                if self.data.is_empty() {
                    self.finished = true;
                    return Ok(None);
                }
                let frame = self.take_frame();
                self.finished = true;
                return Ok(frame);
            }

            let line = std::str::from_utf8(&self.line)
                .map_err(|err| CompatError::Sse(format!("invalid UTF-8: {err}")))?
                .trim_end_matches(['\r', '\n']);

            if line.is_empty() {
                if self.data.is_empty() {
                    continue;
                }
                return Ok(self.take_frame());
            }

            let Some(rest) = line.strip_prefix("data:") else {
                continue;
            };
            let rest = rest.strip_prefix(' ').unwrap_or(rest);
            let separator = usize::from(!self.data.is_empty());
            if self
                .data
                .len()
                .saturating_add(separator)
                .saturating_add(rest.len())
                > self.limits.max_event_bytes
            {
                return Err(CompatError::Sse(format!(
                    "event exceeds max_event_bytes={}",
                    self.limits.max_event_bytes
                )));
            }
            if separator == 1 {
                self.data.push('\n');
            }
            self.data.push_str(rest);
        }
    }
}

pub fn sse_data_stream_from_reader_with_limits<R>(
    reader: R,
    limits: SseLimits,
) -> BoxStream<'static, Result<String>>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    Box::pin(stream::try_unfold(
        SseDataReader::new(reader, limits),
        |mut frames| async move {
            Ok(frames.next_data().await?.map(|data| (data, frames)))
        },
    ))
}

pub fn sse_data_stream_from_reader<R>(reader: R) -> BoxStream<'static, Result<String>>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    sse_data_stream_from_reader_with_limits(reader, SseLimits::default())
}

/// Frames from a chunked byte source such as an HTTP body stream.
pub fn sse_data_stream_from_bytes<S, B>(
    byte_stream: S,
    limits: SseLimits,
) -> BoxStream<'static, Result<String>>
where
    S: Stream<Item = std::result::Result<B, std::io::Error>> + Unpin + Send + 'static,
    B: bytes::Buf + Unpin + Send + 'static,
{
    sse_data_stream_from_reader_with_limits(StreamReader::new(byte_stream), limits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures_util::StreamExt;
    use tokio::io::BufReader;

    fn byte_source(
        chunks: Vec<&'static str>,
    ) -> impl Stream<Item = std::result::Result<Bytes, std::io::Error>> + Unpin + Send + 'static
    {
        stream::iter(chunks.into_iter().map(|chunk| Ok(Bytes::from(chunk))))
    }

    async fn collect(mut frames: BoxStream<'static, Result<String>>) -> Result<Vec<String>> {
        let mut out = Vec::new();
        while let Some(frame) = frames.next().await {
            out.push(frame?);
        }
        Ok(out)
    }

    #[tokio::test]
    async fn joins_multiline_data_and_stops_at_done() -> Result<()> {
        let sse = concat!(
            ": keep-alive\n",
            "event: chunk\n",
            "data: {\"a\":1}\n\n",
            "data: line1\r\n",
            "data: line2\r\n\r\n",
            "data: [DONE]\n\n",
            "data: after-done\n\n",
        );
        let out = collect(sse_data_stream_from_bytes(
            byte_source(vec![sse]),
            SseLimits::default(),
        ))
        .await?;
        assert_eq!(out, vec!["{\"a\":1}", "line1\nline2"]);
        Ok(())
    }

    #[tokio::test]
    async fn frames_split_across_chunks_and_unterminated_tail() -> Result<()> {
        let out = collect(sse_data_stream_from_bytes(
            byte_source(vec!["da", "ta: {\"x\"", ":2}\n", "\ndata: tail"]),
            SseLimits::default(),
        ))
        .await?;
        assert_eq!(out, vec!["{\"x\":2}", "tail"]);
        Ok(())
    }

    #[tokio::test]
    async fn rejects_lines_over_limit() {
        let mut frames = sse_data_stream_from_reader_with_limits(
            BufReader::new(StreamReader::new(byte_source(vec![
                "data: xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx\n\n",
            ]))),
            SseLimits {
                max_line_bytes: 16,
                max_event_bytes: 4096,
            },
        );
        let err = frames
            .next()
            .await
            .expect("one item")
            .expect_err("line too long");
        assert!(matches!(err, CompatError::Sse(ref msg) if msg.contains("max_line_bytes")));
    }

    #[tokio::test]
    async fn accepts_event_exactly_at_limit_and_rejects_beyond() -> Result<()> {
        let limits = SseLimits {
            max_line_bytes: 4096,
            max_event_bytes: 5,
        };
        let out = collect(sse_data_stream_from_bytes(
            byte_source(vec!["data: abcde\n\n"]),
            limits,
        ))
        .await?;
        assert_eq!(out, vec!["abcde"]);

        let mut frames =
            sse_data_stream_from_bytes(byte_source(vec!["data: abc\ndata: de\n\n"]), limits);
        let err = frames
            .next()
            .await
            .expect("one item")
            .expect_err("event too large");
        assert!(err.to_string().contains("max_event_bytes"));
        Ok(())
    }
}
