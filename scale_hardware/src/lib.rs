//! Front-end drivers and hostside peripheral stubs for the weighing
//! station.
//!
//! Real drivers (`Ads1232` bit-banged, `Nau7802` I2C) live behind the
//! `hardware` feature and require rppal on Linux. The simulated
//! implementations below are enough to run the full session loop on a
//! development host.

pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod ads1232;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod nau7802;

use std::collections::VecDeque;
use std::time::Duration;

use scale_traits::{FrontEnd, LineDisplay, TagReader, Uploader};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Widen a 24-bit two's-complement pattern to i32, sign-extending bit 23.
#[inline]
pub fn decode24(bits: u32) -> i32 {
    let bits = bits & 0x00FF_FFFF;
    if bits & 0x0080_0000 != 0 {
        (bits | 0xFF00_0000) as i32
    } else {
        bits as i32
    }
}

/// Scripted front-end: plays back a sequence of raw samples, then repeats
/// the last one. `None` entries simulate a data-ready timeout.
pub struct SimulatedFrontEnd {
    seq: VecDeque<Option<i32>>,
    last: i32,
}

impl SimulatedFrontEnd {
    pub fn new(seq: impl IntoIterator<Item = i32>) -> Self {
        Self {
            seq: seq.into_iter().map(Some).collect(),
            last: 0,
        }
    }

    /// Script including timeout ticks.
    pub fn with_gaps(seq: impl IntoIterator<Item = Option<i32>>) -> Self {
        Self {
            seq: seq.into_iter().collect(),
            last: 0,
        }
    }
}

impl FrontEnd for SimulatedFrontEnd {
    fn read_raw(&mut self, _timeout: Duration) -> Result<i32, BoxError> {
        match self.seq.pop_front() {
            Some(Some(v)) => {
                self.last = v;
                Ok(v)
            }
            Some(None) => Err(Box::new(error::HwError::Timeout)),
            None => Ok(self.last),
        }
    }
}

/// Display sink that writes rows to stdout, one line per update.
#[derive(Debug, Default)]
pub struct ConsoleDisplay;

impl LineDisplay for ConsoleDisplay {
    fn show_line(&mut self, row: u8, text: &str) -> Result<(), BoxError> {
        println!("[{row}] {text}");
        Ok(())
    }
    fn clear(&mut self) -> Result<(), BoxError> {
        println!("----");
        Ok(())
    }
}

/// Uploader that only logs the request; stands in for the network layer.
#[derive(Debug, Default)]
pub struct StdoutUploader;

impl Uploader for StdoutUploader {
    fn send(&mut self, tag: &str, weight: f64) -> Result<(), BoxError> {
        tracing::info!(tag, weight, "upload (stdout stub)");
        println!("upload tag={tag} weight={weight:.3}");
        Ok(())
    }
}

/// Tag reader that yields scripted identifiers, suppressing duplicates the
/// way the real reader reports only a new, distinct UID.
#[derive(Debug, Default)]
pub struct ScriptedTagReader {
    seq: VecDeque<Option<String>>,
    last: Option<String>,
}

impl ScriptedTagReader {
    pub fn new(seq: impl IntoIterator<Item = Option<String>>) -> Self {
        Self {
            seq: seq.into_iter().collect(),
            last: None,
        }
    }
}

impl TagReader for ScriptedTagReader {
    fn poll(&mut self) -> Result<Option<String>, BoxError> {
        let next = self.seq.pop_front().flatten();
        match next {
            Some(id) if id.is_empty() => Ok(None),
            Some(id) if self.last.as_deref() == Some(id.as_str()) => Ok(None),
            Some(id) => {
                self.last = Some(id.clone());
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_front_end_repeats_last_sample() {
        let mut fe = SimulatedFrontEnd::new([10, 20]);
        let t = Duration::from_millis(1);
        assert_eq!(fe.read_raw(t).unwrap(), 10);
        assert_eq!(fe.read_raw(t).unwrap(), 20);
        assert_eq!(fe.read_raw(t).unwrap(), 20);
    }

    #[test]
    fn simulated_front_end_gap_reports_timeout() {
        let mut fe = SimulatedFrontEnd::with_gaps([Some(5), None, Some(7)]);
        let t = Duration::from_millis(1);
        assert_eq!(fe.read_raw(t).unwrap(), 5);
        assert!(fe.read_raw(t).is_err());
        assert_eq!(fe.read_raw(t).unwrap(), 7);
    }

    #[test]
    fn scripted_reader_suppresses_duplicate_tags() {
        let mut r = ScriptedTagReader::new([
            None,
            Some("CAFE01".into()),
            Some("CAFE01".into()),
            Some("BEEF02".into()),
        ]);
        assert_eq!(r.poll().unwrap(), None);
        assert_eq!(r.poll().unwrap(), Some("CAFE01".into()));
        assert_eq!(r.poll().unwrap(), None);
        assert_eq!(r.poll().unwrap(), Some("BEEF02".into()));
    }
}
