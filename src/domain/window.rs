// Live window buffer - trailing time window over the planned and actual series
use super::reading::{ChartPoint, Reading, ReadingBatch, ReadingKey};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};

pub const TRAILING_SECONDS: f64 = 5.0;
pub const LEAD_MARGIN: f64 = 0.5;

/// Points up to this far behind the window start stay drawn
const EVICTION_SLACK_SECONDS: f64 = 1.0;

/// Queue depth kept when no limit is configured: five seconds at eight commits per second
pub const DEFAULT_BACKLOG_LIMIT: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowState {
    pub window_start: f64,
    pub window_end: f64,
    pub trailing_seconds: f64,
    pub lead_margin: f64,
}

impl WindowState {
    pub fn new(trailing_seconds: f64, lead_margin: f64) -> Self {
        Self {
            window_start: 0.0,
            window_end: trailing_seconds + lead_margin,
            trailing_seconds,
            lead_margin,
        }
    }
}

impl Default for WindowState {
    fn default() -> Self {
        Self::new(TRAILING_SECONDS, LEAD_MARGIN)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LiveState {
    Idle,
    Running,
}

/// Frame handed to the presentation sink after every commit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveUpdate {
    pub state: LiveState,
    pub window: WindowState,
    pub planned: Vec<ChartPoint>,
    pub actual: Vec<ChartPoint>,
    pub pending: usize,
}

/// Incrementally fed buffer behind a scrolling live chart.
///
/// New actual readings are queued by [`ingest`](Self::ingest) and released one
/// at a time by [`commit_next`](Self::commit_next), so a burst of arrivals is
/// drawn point by point. Both series only grow at the back and shrink at the
/// front, which keeps them time-ordered.
///
/// The queue holds at most `backlog_limit` readings. A source that outpaces
/// the commit rate loses its oldest queued readings, so the chart stays close
/// to real time instead of falling further behind.
#[derive(Debug)]
pub struct LiveWindowBuffer {
    state: LiveState,
    window: WindowState,
    reference: HashMap<ReadingKey, Reading>,
    reference_len: usize,
    pending: VecDeque<Reading>,
    backlog_limit: usize,
    last_known_len: usize,
    planned: VecDeque<ChartPoint>,
    actual: VecDeque<ChartPoint>,
}

impl LiveWindowBuffer {
    pub fn new(window: WindowState) -> Self {
        Self {
            state: LiveState::Idle,
            window,
            reference: HashMap::new(),
            reference_len: 0,
            pending: VecDeque::new(),
            backlog_limit: DEFAULT_BACKLOG_LIMIT,
            last_known_len: 0,
            planned: VecDeque::new(),
            actual: VecDeque::new(),
        }
    }

    pub fn with_reference(window: WindowState, planned: Vec<Reading>) -> Self {
        let mut buffer = Self::new(window);
        buffer.extend_reference(ReadingBatch::new(planned.len(), planned));
        buffer
    }

    /// Cap the commit queue at `limit` readings (at least one)
    pub fn with_backlog_limit(mut self, limit: usize) -> Self {
        self.backlog_limit = limit.max(1);
        self
    }

    pub fn state(&self) -> LiveState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LiveState::Running
    }

    pub fn window(&self) -> WindowState {
        self.window
    }

    /// Length of the actual series already seen at the source
    pub fn cursor(&self) -> usize {
        self.last_known_len
    }

    /// Length of the planned reference already loaded
    pub fn reference_cursor(&self) -> usize {
        self.reference_len
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Planned readings still waiting for their actual partner
    pub fn unpaired_len(&self) -> usize {
        self.reference.len()
    }

    /// Enter Running with the source currently holding `source_len` readings.
    /// Only readings that arrive after this call are animated.
    pub fn start(&mut self, source_len: usize) {
        if self.is_running() {
            return;
        }
        self.pending.clear();
        self.last_known_len = source_len;
        self.state = LiveState::Running;
    }

    /// Back to Idle, dropping everything not yet committed. Idempotent.
    pub fn stop(&mut self) {
        self.state = LiveState::Idle;
        self.pending.clear();
    }

    /// Add planned readings the source appended since the last call.
    /// Returns how many were added.
    pub fn extend_reference(&mut self, batch: ReadingBatch) -> usize {
        if batch.total <= self.reference_len {
            return 0;
        }
        let fresh = batch.total - self.reference_len;
        let skip = batch.readings.len().saturating_sub(fresh);
        let added = batch.readings.len() - skip;
        for reading in batch.readings.into_iter().skip(skip) {
            self.reference.insert(reading.key(), reading);
        }
        self.reference_len = batch.total;
        added
    }

    /// Queue the readings that arrived since the previous poll.
    ///
    /// `delta = batch.total - cursor`; only the newest `delta` readings of the
    /// batch are taken. Returns the number queued.
    pub fn ingest(&mut self, batch: ReadingBatch) -> usize {
        if !self.is_running() {
            return 0;
        }
        if batch.total < self.last_known_len {
            tracing::warn!(
                "Source shrank from {} to {} readings, resetting cursor",
                self.last_known_len,
                batch.total
            );
            self.last_known_len = batch.total;
            return 0;
        }

        let delta = batch.total - self.last_known_len;
        if delta == 0 {
            return 0;
        }
        let skip = batch.readings.len().saturating_sub(delta);
        let queued = batch.readings.len() - skip;
        self.pending.extend(batch.readings.into_iter().skip(skip));
        self.last_known_len = batch.total;

        let overflow = self.pending.len().saturating_sub(self.backlog_limit);
        if overflow > 0 {
            self.pending.drain(..overflow);
            tracing::warn!(
                "Live backlog over {} readings, dropped {} oldest",
                self.backlog_limit,
                overflow
            );
        }
        queued
    }

    /// Commit the oldest queued reading, if any
    pub fn commit_next(&mut self) -> Option<Reading> {
        if !self.is_running() {
            return None;
        }
        let reading = self.pending.pop_front()?;
        self.commit(reading);
        Some(reading)
    }

    /// Append `reading` and its planned partner, then slide the window to it
    pub fn commit(&mut self, reading: Reading) {
        self.actual.push_back(reading.to_point());

        match self.reference.remove(&reading.key()) {
            Some(planned) => self.planned.push_back(planned.to_point_at(reading.time)),
            None => tracing::trace!(
                "No planned point for {}° cycle {}.{}",
                reading.degree,
                reading.cycle,
                reading.sub_cycle
            ),
        }

        let window_start = (reading.time - self.window.trailing_seconds).max(0.0);
        let cutoff = window_start - EVICTION_SLACK_SECONDS;
        evict_through(&mut self.actual, cutoff);
        evict_through(&mut self.planned, cutoff);
        // Partners that would land behind the window can never be drawn
        self.reference.retain(|_, planned| planned.time > cutoff);

        self.window.window_start = window_start;
        self.window.window_end = reading.time + self.window.lead_margin;
    }

    /// Wipe drawn points and the queue. State and cursors stay, so a running
    /// buffer keeps animating only what arrives next.
    pub fn clear(&mut self) {
        self.planned.clear();
        self.actual.clear();
        self.pending.clear();
        self.window = WindowState::new(self.window.trailing_seconds, self.window.lead_margin);
    }

    pub fn planned(&self) -> impl Iterator<Item = &ChartPoint> {
        self.planned.iter()
    }

    pub fn actual(&self) -> impl Iterator<Item = &ChartPoint> {
        self.actual.iter()
    }

    pub fn snapshot(&self) -> LiveUpdate {
        LiveUpdate {
            state: self.state(),
            window: self.window,
            planned: self.planned().copied().collect(),
            actual: self.actual().copied().collect(),
            pending: self.pending.len(),
        }
    }
}

fn evict_through(series: &mut VecDeque<ChartPoint>, cutoff: f64) {
    while series.front().is_some_and(|p| p.x <= cutoff) {
        series.pop_front();
    }
}
