use crate::error::BufferError;
use crate::EventRecord;
use std::time::Duration;

/// An ordered, finished recording.
///
/// Timestamps are finite, the first one is >= 0 and they never decrease. Nothing can mutate a
/// buffer once it has been built, so playback shares it freely between threads.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MacroBuffer {
    events: Vec<EventRecord>,
}

impl MacroBuffer {
    /// Build a buffer from events read from elsewhere (ex: a macro file), checking the
    /// timestamp invariants.
    pub fn new(events: Vec<EventRecord>) -> Result<Self, BufferError> {
        let mut previous = 0.0;
        for (index, event) in events.iter().enumerate() {
            let t = event.timestamp;
            if !t.is_finite() {
                return Err(BufferError::NonFiniteTimestamp { index });
            }
            if index == 0 && t < 0.0 {
                return Err(BufferError::NegativeStart(t));
            }
            if t < previous {
                return Err(BufferError::OutOfOrder {
                    index,
                    timestamp: t,
                    previous,
                });
            }
            previous = t;
        }

        Ok(Self { events })
    }

    /// Build a buffer from freshly captured events, repairing rather than rejecting.
    ///
    /// Non-finite or negative timestamps become 0 and the events are stably sorted by time.
    pub fn from_capture(mut events: Vec<EventRecord>) -> Self {
        for event in events.iter_mut() {
            if !event.timestamp.is_finite() || event.timestamp < 0.0 {
                event.timestamp = 0.0;
            }
        }
        events.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Self { events }
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Timestamp of the last event, i.e. how long a replay at 1x takes
    pub fn duration(&self) -> Duration {
        self.events
            .last()
            .map(|e| Duration::try_from_secs_f64(e.timestamp).unwrap_or(Duration::MAX))
            .unwrap_or_default()
    }

    pub fn into_events(self) -> Vec<EventRecord> {
        self.events
    }
}

impl<'a> IntoIterator for &'a MacroBuffer {
    type Item = &'a EventRecord;
    type IntoIter = std::slice::Iter<'a, EventRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
