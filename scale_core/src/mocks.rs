//! Test and helper mocks for scale_core.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scale_traits::{FrontEnd, LineDisplay, TagReader, Uploader};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Front-end that plays back a sequence, then repeats the last sample.
/// `Err(())` entries simulate a data-ready timeout.
pub struct ScriptedFrontEnd {
    seq: VecDeque<Result<i32, ()>>,
    last: i32,
}

impl ScriptedFrontEnd {
    pub fn new(seq: impl IntoIterator<Item = i32>) -> Self {
        Self {
            seq: seq.into_iter().map(Ok).collect(),
            last: 0,
        }
    }

    pub fn with_timeouts(seq: impl IntoIterator<Item = Result<i32, ()>>) -> Self {
        Self {
            seq: seq.into_iter().collect(),
            last: 0,
        }
    }
}

impl FrontEnd for ScriptedFrontEnd {
    fn read_raw(&mut self, _timeout: Duration) -> Result<i32, BoxError> {
        match self.seq.pop_front() {
            Some(Ok(v)) => {
                self.last = v;
                Ok(v)
            }
            Some(Err(())) => Err("sensor timeout".into()),
            None => Ok(self.last),
        }
    }
}

/// Display that records every line it is asked to show.
#[derive(Clone, Default)]
pub struct RecordingDisplay {
    pub lines: Arc<Mutex<Vec<(u8, String)>>>,
    pub clears: Arc<Mutex<u32>>,
}

impl LineDisplay for RecordingDisplay {
    fn show_line(&mut self, row: u8, text: &str) -> Result<(), BoxError> {
        self.lines
            .lock()
            .map_err(|_| "poisoned")?
            .push((row, text.to_string()));
        Ok(())
    }
    fn clear(&mut self) -> Result<(), BoxError> {
        *self.clears.lock().map_err(|_| "poisoned")? += 1;
        Ok(())
    }
}

/// Uploader that records requests and optionally fails them.
#[derive(Clone, Default)]
pub struct RecordingUploader {
    pub sent: Arc<Mutex<Vec<(String, f64)>>>,
    pub fail: bool,
}

impl Uploader for RecordingUploader {
    fn send(&mut self, tag: &str, weight: f64) -> Result<(), BoxError> {
        self.sent
            .lock()
            .map_err(|_| "poisoned")?
            .push((tag.to_string(), weight));
        if self.fail {
            return Err("upstream rejected".into());
        }
        Ok(())
    }
}

/// Tag reader fed from a queue; `None` means no new tag this poll.
#[derive(Clone, Default)]
pub struct QueuedTagReader {
    pub queue: Arc<Mutex<VecDeque<Option<String>>>>,
}

impl QueuedTagReader {
    pub fn push(&self, tag: Option<&str>) {
        if let Ok(mut q) = self.queue.lock() {
            q.push_back(tag.map(str::to_string));
        }
    }
}

impl TagReader for QueuedTagReader {
    fn poll(&mut self) -> Result<Option<String>, BoxError> {
        Ok(self
            .queue
            .lock()
            .map_err(|_| "poisoned")?
            .pop_front()
            .flatten())
    }
}
