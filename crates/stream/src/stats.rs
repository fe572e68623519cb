use std::collections::VecDeque;
use std::time::Duration;

/// Counters from one streamer update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamStats {
    pub camera_changes: usize,
    pub edge_views: usize,
    pub tiles_spawned: usize,
    /// Spawns skipped because the cell was already live.
    pub spawns_skipped: usize,
    pub tiles_disposed: usize,
    pub live_tiles: usize,
    pub frame_time: Duration,
}

/// The last `capacity` updates: how long each took and how much the live
/// set churned.
#[derive(Debug)]
pub struct UpdateWindow {
    samples: VecDeque<StreamStats>,
    capacity: usize,
}

impl UpdateWindow {
    /// A window of at least one update.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record(&mut self, stats: &StreamStats) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(stats.clone());
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn times(&self) -> impl Iterator<Item = Duration> + '_ {
        self.samples.iter().map(|s| s.frame_time)
    }

    pub fn average(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        self.times().sum::<Duration>() / self.samples.len() as u32
    }

    pub fn max(&self) -> Duration {
        self.times().max().unwrap_or_default()
    }

    pub fn min(&self) -> Duration {
        self.times().min().unwrap_or_default()
    }

    /// Most tiles spawned by a single update in the window.
    pub fn peak_spawned(&self) -> usize {
        self.samples.iter().map(|s| s.tiles_spawned).max().unwrap_or(0)
    }

    pub fn peak_disposed(&self) -> usize {
        self.samples.iter().map(|s| s.tiles_disposed).max().unwrap_or(0)
    }

    /// Updates in the window that changed the live set.
    pub fn churning_updates(&self) -> usize {
        self.samples
            .iter()
            .filter(|s| s.tiles_spawned > 0 || s.tiles_disposed > 0)
            .count()
    }

    /// Live tile count after the newest update.
    pub fn live_tiles(&self) -> usize {
        self.samples.back().map_or(0, |s| s.live_tiles)
    }
}
