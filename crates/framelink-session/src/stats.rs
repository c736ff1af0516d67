use serde::Serialize;

/// Broadcast performance counters, accumulated per publish.
///
/// Min/max use 0.0 as "unset"; the first sample establishes both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Stats {
    pub frames_sent: u64,
    pub total_entities: u64,
    pub bytes_sent: u64,
    /// Seconds spent inside broadcast calls.
    pub total_time: f64,
    pub min_frame_time: f64,
    pub max_frame_time: f64,
}

impl Stats {
    pub(crate) fn record_broadcast(&mut self, frame_time: f64, entities: usize, bytes: usize) {
        self.frames_sent += 1;
        self.total_entities += entities as u64;
        self.bytes_sent += bytes as u64;
        self.total_time += frame_time;
        if frame_time > self.max_frame_time || self.max_frame_time == 0.0 {
            self.max_frame_time = frame_time;
        }
        if frame_time < self.min_frame_time || self.min_frame_time == 0.0 {
            self.min_frame_time = frame_time;
        }
    }

    pub fn reset(&mut self) {
        *self = Stats::default();
    }

    /// Average seconds per broadcast, 0.0 before the first frame.
    pub fn avg_frame_time(&self) -> f64 {
        if self.frames_sent == 0 {
            0.0
        } else {
            self.total_time / self.frames_sent as f64
        }
    }

    /// Average entities per frame, 0.0 before the first frame.
    pub fn avg_entities(&self) -> f64 {
        if self.frames_sent == 0 {
            0.0
        } else {
            self.total_entities as f64 / self.frames_sent as f64
        }
    }

    /// Entity throughput over time spent broadcasting.
    pub fn entities_per_second(&self) -> f64 {
        if self.total_time == 0.0 {
            0.0
        } else {
            self.total_entities as f64 / self.total_time
        }
    }

    /// Byte throughput over time spent broadcasting.
    pub fn bytes_per_second(&self) -> f64 {
        if self.total_time == 0.0 {
            0.0
        } else {
            self.bytes_sent as f64 / self.total_time
        }
    }
}
