//! Line echo loop: read a line, upper-case it, record latency and length.
//!
//! Lines are raw bytes; lengths are byte counts and invalid UTF-8 is
//! echoed with replacement characters.
//!
//! Two lines are commands rather than input:
//! - `UNREGISTER` resets the line-count view (unregister, then register).
//! - `NEGATIVE` records -15 as the line length.

use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use wxgauge_core::Result;

use crate::obs::views::{self, LATENCY_MS, LINE_LENGTHS, TAG_ERROR, TAG_METHOD, TAG_STATUS};
use crate::obs::MetricsRegistry;

const UNREGISTER: &[u8] = b"UNREGISTER";
const NEGATIVE: &[u8] = b"NEGATIVE";
const NEGATIVE_LENGTH: f64 = -15.0;

pub struct LineProcessor {
    registry: Arc<MetricsRegistry>,
}

impl LineProcessor {
    pub fn new(registry: Arc<MetricsRegistry>) -> Self {
        Self { registry }
    }

    /// Upper-case `line` and record its length and processing latency.
    pub fn process_line(&self, line: &[u8]) -> Result<String> {
        let start = Instant::now();

        if line == UNREGISTER {
            self.registry.reregister(views::line_count_view())?;
            tracing::info!(view = views::LINE_COUNT_VIEW, "line count view reset");
            return Ok(String::from_utf8_lossy(line).to_uppercase());
        }

        let length = if line == NEGATIVE {
            NEGATIVE_LENGTH
        } else {
            line.len() as f64
        };
        let out = String::from_utf8_lossy(line).to_uppercase();

        let tags = [(TAG_METHOD, "repl"), (TAG_STATUS, "OK")];
        self.registry.record(&LATENCY_MS, since_ms(start), &tags);
        self.registry.record(&LINE_LENGTHS, length, &tags);

        Ok(out)
    }

    /// Prompt, read, process, print until EOF.
    pub async fn run<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        loop {
            let start = Instant::now();

            writer.write_all(b"> ").await?;
            writer.flush().await?;

            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                tracing::debug!("line input closed");
                return Ok(());
            }

            match self.process_line(trim_line_end(&buf)) {
                Ok(out) => {
                    writer.write_all(format!("< {out}\n\n").as_bytes()).await?;
                    writer.flush().await?;
                    let tags = [(TAG_METHOD, "repl"), (TAG_STATUS, "OK")];
                    self.registry.record(&LATENCY_MS, since_ms(start), &tags);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "line processing failed");
                    let msg = e.to_string();
                    let tags = [(TAG_METHOD, "repl"), (TAG_STATUS, "ERROR"), (TAG_ERROR, msg.as_str())];
                    self.registry.record(&LATENCY_MS, since_ms(start), &tags);
                }
            }
        }
    }
}

fn since_ms(start: Instant) -> f64 {
    start.elapsed().as_nanos() as f64 / 1e6
}

fn trim_line_end(buf: &[u8]) -> &[u8] {
    let line = buf.strip_suffix(b"\n").unwrap_or(buf);
    line.strip_suffix(b"\r").unwrap_or(line)
}
