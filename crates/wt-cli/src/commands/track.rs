//! Track command: feeds browser events into the tracker.
//!
//! Events arrive as JSON lines on stdin. In replay mode each event must
//! carry its own timestamp and the stream is processed as fast as it can be
//! read. In live mode a periodic tick flushes the open segment and end of
//! input flushes once more before exiting. Ticks follow the stream's own
//! clock, so a stamped stream is never flushed against the wall clock.

use std::io::{BufRead, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use wt_core::{ActivityTracker, Event, EventKind, LedgerStore};

/// Shortest flush interval accepted by [`live`].
pub const MIN_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// How far past the wall clock an event timestamp may lie before it is
/// distrusted.
const MAX_FUTURE_SKEW_SECS: i64 = 300;

/// Counters for one tracking run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackStats {
    pub events: usize,
    pub commits: usize,
    pub skipped: usize,
}

impl TrackStats {
    fn record(&mut self, committed: bool) {
        self.events += 1;
        if committed {
            self.commits += 1;
        }
    }
}

/// Replays a recorded event stream.
///
/// Malformed lines and events without a timestamp are skipped with a
/// warning; they never stop the replay.
pub fn replay<R, S>(reader: R, tracker: &mut ActivityTracker, store: &mut S) -> Result<TrackStats>
where
    R: BufRead,
    S: LedgerStore,
{
    let mut stats = TrackStats::default();
    for (index, line) in reader.lines().enumerate() {
        let line = line.context("failed to read event stream")?;
        let Some(event) = parse_line(&line, index + 1, &mut stats) else {
            continue;
        };
        let Some(timestamp) = event.timestamp else {
            tracing::warn!(line = index + 1, "skipping event without timestamp");
            stats.skipped += 1;
            continue;
        };
        let committed = tracker.process(&event.kind, timestamp, store).is_some();
        stats.record(committed);
    }
    Ok(stats)
}

/// Tracks a live event stream until its input closes.
pub async fn live<R, S>(
    input: R,
    tracker: &mut ActivityTracker,
    store: &mut S,
    tick_interval: Duration,
) -> Result<TrackStats>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    S: LedgerStore,
{
    let (tx, mut rx) = mpsc::channel::<String>(64);
    let reader = tokio::spawn(async move {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            if tx.send(line).await.is_err() {
                break;
            }
        }
        Ok::<_, std::io::Error>(())
    });

    let mut ticker = tokio::time::interval(tick_interval.max(MIN_TICK_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    let mut clock = StreamClock::default();
    let mut stats = TrackStats::default();
    let mut line_number = 0;
    loop {
        tokio::select! {
            line = rx.recv() => {
                let Some(line) = line else { break };
                line_number += 1;
                if let Some(event) = parse_line(&line, line_number, &mut stats) {
                    let now = clock.observe(event.timestamp);
                    let committed = tracker.process(&event.kind, now, store).is_some();
                    stats.record(committed);
                }
            }
            _ = ticker.tick() => {
                tracker.process(&EventKind::Tick, clock.advance(), store);
            }
        }
    }

    // Flush whatever is open before exiting.
    tracker.process(&EventKind::Tick, clock.advance(), store);

    match reader.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::warn!(error = %err, "event input failed"),
        Err(err) => tracing::warn!(error = %err, "event reader task failed"),
    }
    Ok(stats)
}

pub fn write_summary<W: Write>(writer: &mut W, stats: &TrackStats) -> Result<()> {
    writeln!(
        writer,
        "Processed {} events: {} commits, {} skipped",
        stats.events, stats.commits, stats.skipped
    )?;
    Ok(())
}

/// Time as seen by a live stream.
///
/// Anchored at the last observed time and advanced by the monotonic clock
/// since then. Observed times never move backwards.
#[derive(Debug, Default)]
struct StreamClock {
    anchor: Option<(DateTime<Utc>, Instant)>,
}

impl StreamClock {
    fn now(&self) -> DateTime<Utc> {
        match self.anchor {
            Some((at, seen)) => {
                let elapsed = TimeDelta::from_std(seen.elapsed()).unwrap_or_else(|_| TimeDelta::zero());
                at.checked_add_signed(elapsed).unwrap_or(at)
            }
            None => Utc::now(),
        }
    }

    /// Time to apply an event or tick at. Unstamped events and stamps far
    /// in the future use the stream time instead.
    fn observe(&mut self, timestamp: Option<DateTime<Utc>>) -> DateTime<Utc> {
        let current = self.now();
        let at = match timestamp {
            Some(stamp) if stamp > Utc::now() + TimeDelta::seconds(MAX_FUTURE_SKEW_SECS) => {
                tracing::warn!(%stamp, "event timestamp is in the future, using stream time");
                current
            }
            Some(stamp) => match self.anchor {
                Some((last, _)) => stamp.max(last),
                None => stamp,
            },
            None => current,
        };
        self.anchor = Some((at, Instant::now()));
        at
    }

    /// Time for a tick. Before the first event the clock stays unanchored.
    fn advance(&mut self) -> DateTime<Utc> {
        match self.anchor {
            Some(_) => self.observe(None),
            None => Utc::now(),
        }
    }
}

fn parse_line(line: &str, line_number: usize, stats: &mut TrackStats) -> Option<Event> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(event) => Some(event),
        Err(err) => {
            tracing::warn!(line = line_number, error = %err, "skipping malformed event");
            stats.skipped += 1;
            None
        }
    }
}
