// Live chart service - Drives a LiveWindowBuffer from the repository on two tickers
use crate::application::monitor_repository::MonitorRepository;
use crate::domain::cycle::Frequency;
use crate::domain::error::ChartError;
use crate::domain::reading::SeriesKind;
use crate::domain::window::{LiveUpdate, LiveWindowBuffer, WindowState};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::WatchStream;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveSettings {
    pub ingest_interval: Duration,
    pub commit_interval: Duration,
    pub trailing_seconds: f64,
    pub lead_margin: f64,
    pub channel_capacity: usize,
}

impl LiveSettings {
    /// Queue depth that drains within one trailing window at the commit rate
    pub fn backlog_limit(&self) -> usize {
        let per_commit = self.commit_interval.as_secs_f64();
        if per_commit <= 0.0 {
            return 1;
        }
        ((self.trailing_seconds / per_commit).ceil() as usize).max(1)
    }
}

impl Default for LiveSettings {
    fn default() -> Self {
        let window = WindowState::default();
        Self {
            ingest_interval: Duration::from_millis(125),
            commit_interval: Duration::from_millis(125),
            trailing_seconds: window.trailing_seconds,
            lead_margin: window.lead_margin,
            channel_capacity: 100,
        }
    }
}

/// The two running ticker tasks. Dropping them cancels both.
struct Tickers {
    ingest: JoinHandle<()>,
    commit: JoinHandle<()>,
}

impl Drop for Tickers {
    fn drop(&mut self) {
        self.ingest.abort();
        self.commit.abort();
    }
}

/// One live chart: a buffer, its tickers and the sink it publishes to.
///
/// The session owns its tasks; dropping it stops them.
pub struct LiveSession {
    monitor_id: String,
    repository: Arc<dyn MonitorRepository>,
    buffer: Arc<Mutex<LiveWindowBuffer>>,
    updates: mpsc::Sender<LiveUpdate>,
    settings: LiveSettings,
    tickers: Option<Tickers>,
}

impl LiveSession {
    /// Fails with `InvalidFrequency` so a session for a bad monitor never runs
    pub fn new(
        monitor_id: String,
        frequency_hz: f64,
        repository: Arc<dyn MonitorRepository>,
        settings: LiveSettings,
        updates: mpsc::Sender<LiveUpdate>,
    ) -> Result<Self, ChartError> {
        Frequency::new(frequency_hz)?;
        let window = WindowState::new(settings.trailing_seconds, settings.lead_margin);

        Ok(Self {
            monitor_id,
            repository,
            buffer: Arc::new(Mutex::new(
                LiveWindowBuffer::new(window).with_backlog_limit(settings.backlog_limit()),
            )),
            updates,
            settings,
            tickers: None,
        })
    }

    pub fn is_running(&self) -> bool {
        self.tickers.is_some()
    }

    pub async fn snapshot(&self) -> LiveUpdate {
        self.buffer.lock().await.snapshot()
    }

    /// Idle -> Running. Animation starts from what the source holds now.
    pub async fn start(&mut self) -> anyhow::Result<()> {
        if self.is_running() {
            return Ok(());
        }

        let planned = self
            .repository
            .readings_since(&self.monitor_id, SeriesKind::Planned, 0)
            .await?;
        let actual = self
            .repository
            .readings_since(&self.monitor_id, SeriesKind::Actual, usize::MAX)
            .await?;
        {
            let mut buffer = self.buffer.lock().await;
            buffer.extend_reference(planned);
            buffer.start(actual.total);
        }

        self.tickers = Some(Tickers {
            ingest: tokio::spawn(ingest_loop(
                self.monitor_id.clone(),
                self.repository.clone(),
                self.buffer.clone(),
                self.settings.ingest_interval,
            )),
            commit: tokio::spawn(commit_loop(
                self.buffer.clone(),
                self.updates.clone(),
                self.settings.commit_interval,
            )),
        });

        tracing::info!("Live chart for {} running", self.monitor_id);
        Ok(())
    }

    /// Running -> Idle, discarding uncommitted points. Safe to repeat.
    pub async fn stop(&mut self) {
        let was_running = self.tickers.take().is_some();
        self.buffer.lock().await.stop();
        if was_running {
            tracing::info!("Live chart for {} stopped", self.monitor_id);
        }
    }

    /// Wipe the drawn chart and publish the empty frame
    pub async fn clear(&mut self) {
        let update = {
            let mut buffer = self.buffer.lock().await;
            buffer.clear();
            buffer.snapshot()
        };
        tracing::info!("Live chart for {} cleared", self.monitor_id);
        if self.updates.send(update).await.is_err() {
            tracing::debug!("Live chart for {} has no listener", self.monitor_id);
        }
    }

    /// Follow a run flag until it is dropped or the sink goes away.
    /// Monitor ids arriving on `clears` wipe this chart when they match.
    pub async fn follow(
        mut self,
        run: watch::Receiver<bool>,
        mut clears: broadcast::Receiver<String>,
    ) {
        let updates = self.updates.clone();
        let mut flags = WatchStream::new(run);
        let mut clears_open = true;

        loop {
            tokio::select! {
                flag = flags.next() => match flag {
                    Some(true) => {
                        if let Err(e) = self.start().await {
                            tracing::warn!("Live chart for {} failed to start: {}", self.monitor_id, e);
                        }
                    }
                    Some(false) => self.stop().await,
                    None => break,
                },
                cleared = clears.recv(), if clears_open => match cleared {
                    Ok(id) if id == self.monitor_id => self.clear().await,
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => clears_open = false,
                },
                _ = updates.closed() => break,
            }
        }

        self.stop().await;
        tracing::debug!("Live chart for {} detached", self.monitor_id);
    }
}

async fn ingest_loop(
    monitor_id: String,
    repository: Arc<dyn MonitorRepository>,
    buffer: Arc<Mutex<LiveWindowBuffer>>,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let (cursor, reference_cursor) = {
            let buffer = buffer.lock().await;
            (buffer.cursor(), buffer.reference_cursor())
        };

        let planned = repository
            .readings_since(&monitor_id, SeriesKind::Planned, reference_cursor)
            .await;
        let actual = repository
            .readings_since(&monitor_id, SeriesKind::Actual, cursor)
            .await;

        match (planned, actual) {
            (Ok(planned), Ok(actual)) => {
                let mut buffer = buffer.lock().await;
                buffer.extend_reference(planned);
                let queued = buffer.ingest(actual);
                if queued > 0 {
                    tracing::debug!(
                        "Queued {} readings for {}, {} planned unpaired",
                        queued,
                        monitor_id,
                        buffer.unpaired_len()
                    );
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!("Polling readings for {} failed: {}", monitor_id, e);
            }
        }
    }
}

async fn commit_loop(
    buffer: Arc<Mutex<LiveWindowBuffer>>,
    updates: mpsc::Sender<LiveUpdate>,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let update = {
            let mut buffer = buffer.lock().await;
            match buffer.commit_next() {
                Some(_) => buffer.snapshot(),
                None => continue,
            }
        };

        if updates.send(update).await.is_err() {
            break;
        }
    }
}

#[derive(Clone)]
pub struct LiveChartService {
    repository: Arc<dyn MonitorRepository>,
    settings: LiveSettings,
    clears: broadcast::Sender<String>,
}

impl LiveChartService {
    pub fn new(repository: Arc<dyn MonitorRepository>, settings: LiveSettings) -> Self {
        Self {
            repository,
            settings,
            clears: broadcast::channel(16).0,
        }
    }

    /// Wipe every open live chart of a monitor. Returns how many charts were
    /// reached, `None` when the monitor is unknown.
    pub async fn clear(&self, monitor_id: &str) -> anyhow::Result<Option<usize>> {
        if self.repository.get_monitor(monitor_id).await?.is_none() {
            return Ok(None);
        }
        // No receivers just means no chart is open
        Ok(Some(self.clears.send(monitor_id.to_string()).unwrap_or(0)))
    }

    /// Attach a live chart to a monitor. `None` when the monitor is unknown.
    ///
    /// The session follows the monitor's live flag and ends when the returned
    /// receiver is dropped.
    pub async fn open(
        &self,
        monitor_id: &str,
    ) -> anyhow::Result<Option<mpsc::Receiver<LiveUpdate>>> {
        let Some(monitor) = self.repository.get_monitor(monitor_id).await? else {
            return Ok(None);
        };

        let (tx, rx) = mpsc::channel(self.settings.channel_capacity);
        let session = LiveSession::new(
            monitor.id.clone(),
            monitor.frequency_hz,
            self.repository.clone(),
            self.settings,
            tx,
        )?;
        let run = self.repository.subscribe_live(monitor_id).await?;

        tokio::spawn(session.follow(run, self.clears.subscribe()));
        Ok(Some(rx))
    }
}
