use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, Result};
use flate2::read::GzDecoder;
use futures_util::stream::{self, BoxStream, StreamExt};
use tracing::{info, warn};

use dupeguard_domain::{EventSource, RawEvent, TransactionKind};

const YIELD_EVERY: usize = 256;

/// Recorded host events, one JSON object per line.
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    events: Vec<RawEvent>,
    skipped: usize,
}

impl ReplaySource {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|err| anyhow!("failed to read replay file {}: {}", path.display(), err))?;
        let content = if path.extension().and_then(|ext| ext.to_str()) == Some("gz") {
            let mut decoder = GzDecoder::new(bytes.as_slice());
            let mut out = String::new();
            decoder.read_to_string(&mut out)?;
            out
        } else {
            String::from_utf8(bytes)?
        };
        let source = Self::from_lines(&content);
        info!(
            path = %path.display(),
            events = source.events.len(),
            skipped = source.skipped,
            "replay file loaded"
        );
        Ok(source)
    }

    pub fn from_lines(content: &str) -> Self {
        let mut events = Vec::new();
        let mut skipped = 0;
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<RawEvent>(line) {
                Ok(event) => events.push(event),
                Err(err) => {
                    skipped += 1;
                    warn!(line = index + 1, "skipping unreadable replay line: {}", err);
                }
            }
        }
        Self { events, skipped }
    }

    /// Shifts every timed event so the first one lands at `now_ms`, keeping
    /// relative spacing. Untimed events stay untimed.
    pub fn rebase(&mut self, now_ms: i64) {
        let Some(first) = self.events.iter().find_map(|event| event.event_time) else {
            return;
        };
        let offset = now_ms - first;
        for event in &mut self.events {
            if let Some(time) = event.event_time.as_mut() {
                *time += offset;
            }
        }
    }

    pub fn events(&self) -> &[RawEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl EventSource for ReplaySource {
    fn subscribe(&self, kinds: &[TransactionKind]) -> BoxStream<'static, RawEvent> {
        // unknown types pass through so the normalizer counts them
        let events: Vec<RawEvent> = self
            .events
            .iter()
            .filter(|event| {
                TransactionKind::parse(&event.event_type)
                    .map(|kind| kinds.contains(&kind))
                    .unwrap_or(true)
            })
            .cloned()
            .collect();
        stream::iter(events.into_iter().enumerate())
            .then(|(index, event)| async move {
                if index % YIELD_EVERY == YIELD_EVERY - 1 {
                    tokio::task::yield_now().await;
                }
                event
            })
            .boxed()
    }
}
