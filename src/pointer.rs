//! Pointer samples read from a text source, one `x y [z [buttons]]` per line.

use std::pin::Pin;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_stream::wrappers::LinesStream;
use tokio_stream::{Stream, StreamExt};
use tracing::warn;
use wctablet_core::PointerSample;

pub type SampleStream = Pin<Box<dyn Stream<Item = PointerSample>>>;

/// Parse one sample line. Fields are separated by whitespace or commas.
pub fn parse_sample(line: &str) -> Result<PointerSample, String> {
    let fields: Vec<&str> = line
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|f| !f.is_empty())
        .collect();
    if !(2..=4).contains(&fields.len()) {
        return Err(format!("expected `x y [z [buttons]]`, got {line:?}"));
    }

    Ok(PointerSample {
        x: field(&fields, 0, "x")?,
        y: field(&fields, 1, "y")?,
        z: field(&fields, 2, "z")?,
        buttons: field(&fields, 3, "buttons")?,
    })
}

/// Parse field `i`, defaulting to zero when absent
fn field<T>(fields: &[&str], i: usize, name: &str) -> Result<T, String>
where
    T: TryFrom<i64> + Default,
{
    let Some(value) = fields.get(i) else {
        return Ok(T::default());
    };
    value
        .parse::<i64>()
        .ok()
        .and_then(|n| T::try_from(n).ok())
        .ok_or_else(|| format!("invalid {name} {value:?}"))
}

/// Stream samples from `reader`. Blank lines and `#` comments are skipped,
/// malformed lines are logged and skipped.
pub fn sample_stream<R>(reader: R) -> SampleStream
where
    R: AsyncBufRead + Unpin + 'static,
{
    Box::pin(
        LinesStream::new(reader.lines()).filter_map(|line| match line {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    return None;
                }
                parse_sample(line)
                    .inspect_err(|e| warn!("skipping pointer sample: {e}"))
                    .ok()
            },
            Err(e) => {
                warn!(error = %e, "failed to read pointer source");
                None
            },
        }),
    )
}
