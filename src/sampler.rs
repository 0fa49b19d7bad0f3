/// Periodic RSSI sampling and hand-off of computed colours to the display
use log::{debug, trace, warn};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::error::PainterError;
use crate::mapping::map_signal_to_color;
use crate::models::{ColorValue, SignalRange, SignalSample};

pub type ReadFuture = Pin<Box<dyn Future<Output = Result<SignalSample, PainterError>> + Send>>;

/// Something that can be asked for a fresh signal strength reading
///
/// The returned future must not borrow the source: reads outlive the tick
/// that issued them.
pub trait SignalSource: Send + Sync + 'static {
    fn read_signal_strength(&self) -> ReadFuture;
}

/// Receiver of accepted colours. Only the sampler's publisher task calls it.
pub trait ColorDisplay: Send + 'static {
    fn on_color_computed(&mut self, color: ColorValue);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerSettings {
    /// Time between two ticks
    pub interval: Duration,
    /// Reads allowed in flight at once; ticks beyond this are skipped
    pub max_in_flight: usize,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        SamplerSettings {
            interval: Duration::from_millis(1),
            max_in_flight: 8,
        }
    }
}

/// What happened during one sampling session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerReport {
    pub ticks: u64,
    pub accepted: u64,
    pub stale: u64,
    pub read_issues: u64,
    pub skipped: u64,
}

/// Keeps track of the newest applied sample sequence number
#[derive(Debug, Default)]
pub struct LatestOnly {
    last_applied: Option<u64>,
}

impl LatestOnly {
    /// Returns true and records `sequence` if it is newer than anything applied so far
    pub fn accept(&mut self, sequence: u64) -> bool {
        match self.last_applied {
            Some(last) if sequence <= last => false,
            _ => {
                self.last_applied = Some(sequence);
                true
            }
        }
    }
}

#[derive(Debug)]
struct Completion {
    sequence: u64,
    sample: SignalSample,
    color: ColorValue,
}

#[derive(Debug, Default)]
struct TickCounters {
    ticks: AtomicU64,
    read_issues: AtomicU64,
    skipped: AtomicU64,
}

#[derive(Debug, Default)]
struct PublishCounters {
    accepted: u64,
    stale: u64,
}

/// A running sampling session
///
/// Dropping the sampler halts the ticker and the publisher; `stop` does the
/// same and hands the display back together with the session report.
pub struct Sampler<D> {
    ticker: JoinHandle<()>,
    publisher: JoinHandle<(D, PublishCounters)>,
    shutdown: watch::Sender<bool>,
    counters: Arc<TickCounters>,
}

impl<D: ColorDisplay> Sampler<D> {
    /// Start ticking against `source`, painting accepted colours on `display`
    ///
    /// The range is read from `range` each time a reading completes, so an
    /// update applies to the next computed colour only.
    ///
    /// # Arguments
    /// * `source` - Where readings come from, shared with every read task
    /// * `range` - Calibration window, followed for the whole session
    /// * `display` - Receives each accepted colour; handed back by `stop`
    /// * `settings` - Tick interval and the bound on reads in flight
    ///
    /// # Returns
    /// A running sampler. Nothing is painted until the first read completes.
    pub fn start<S: SignalSource>(
        source: Arc<S>,
        range: watch::Receiver<SignalRange>,
        display: D,
        settings: SamplerSettings,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let counters = Arc::new(TickCounters::default());

        let ticker = tokio::spawn(run_ticker(
            source,
            range,
            completion_tx,
            settings,
            counters.clone(),
            shutdown_rx.clone(),
        ));
        let publisher = tokio::spawn(run_publisher(display, completion_rx, shutdown_rx));

        Sampler {
            ticker,
            publisher,
            shutdown,
            counters,
        }
    }

    /// Halt future ticks and wait for the publisher to let go of the display
    ///
    /// Reads still in flight complete in the background and are discarded.
    pub async fn stop(self) -> Result<(D, SamplerReport), PainterError> {
        let Sampler {
            ticker,
            publisher,
            shutdown,
            counters,
        } = self;

        let _ = shutdown.send(true);
        ticker.await?;
        let (display, published) = publisher.await?;

        let report = SamplerReport {
            ticks: counters.ticks.load(Ordering::Relaxed),
            accepted: published.accepted,
            stale: published.stale,
            read_issues: counters.read_issues.load(Ordering::Relaxed),
            skipped: counters.skipped.load(Ordering::Relaxed),
        };
        Ok((display, report))
    }
}

async fn run_ticker<S: SignalSource>(
    source: Arc<S>,
    range: watch::Receiver<SignalRange>,
    completions: mpsc::UnboundedSender<Completion>,
    settings: SamplerSettings,
    counters: Arc<TickCounters>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticks = interval(settings.interval);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let in_flight = Arc::new(Semaphore::new(settings.max_in_flight.max(1)));
    let mut sequence: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticks.tick() => {}
        }
        counters.ticks.fetch_add(1, Ordering::Relaxed);

        let permit = match in_flight.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                counters.skipped.fetch_add(1, Ordering::Relaxed);
                trace!("Tick skipped, {} reads in flight", settings.max_in_flight);
                continue;
            }
        };

        sequence += 1;
        let read = source.read_signal_strength();
        let range = range.clone();
        let completions = completions.clone();
        let counters = counters.clone();

        tokio::spawn(async move {
            let _permit = permit;
            let sample = match read.await {
                Ok(sample) => sample,
                Err(e) => {
                    counters.read_issues.fetch_add(1, Ordering::Relaxed);
                    debug!("Sample {} skipped: {}", sequence, e);
                    return;
                }
            };

            let current_range = *range.borrow();
            match map_signal_to_color(sample, &current_range) {
                // A closed channel means the sampler stopped; the late result is dropped
                Ok(color) => {
                    let _ = completions.send(Completion {
                        sequence,
                        sample,
                        color,
                    });
                }
                Err(e) => warn!("Sample {} not mapped: {}", sequence, e),
            }
        });
    }
}

async fn run_publisher<D: ColorDisplay>(
    mut display: D,
    mut completions: mpsc::UnboundedReceiver<Completion>,
    mut shutdown: watch::Receiver<bool>,
) -> (D, PublishCounters) {
    let mut latest = LatestOnly::default();
    let mut counters = PublishCounters::default();

    loop {
        let completion = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            completion = completions.recv() => match completion {
                Some(completion) => completion,
                None => break,
            },
        };

        if latest.accept(completion.sequence) {
            trace!(
                "Sample {}: {} dBm -> {}",
                completion.sequence,
                completion.sample.0,
                completion.color
            );
            display.on_color_computed(completion.color);
            counters.accepted += 1;
        } else {
            trace!("Sample {} is stale, discarded", completion.sequence);
            counters.stale += 1;
        }
    }

    (display, counters)
}
