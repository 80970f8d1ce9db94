//! Event-level filtering owned by the event loop.
//!
//! - duplicate rejection for real data, keyed on (run, lumi, event)
//! - a list of events with known bad calibration, rejected for real data
//!
//! The filter is a plain value: the caller creates it, consults it sequentially, and
//! drops it when the run ends.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::domain::{Event, EventId};
use crate::error::AppError;

/// Why an event was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Duplicate,
    BadCalibration,
}

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    seen: HashSet<EventId>,
    bad: HashSet<EventId>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bad_events(bad: impl IntoIterator<Item = EventId>) -> Self {
        Self {
            seen: HashSet::new(),
            bad: bad.into_iter().collect(),
        }
    }

    /// Load a bad-calibration list: one `run event lumi` triple per line.
    ///
    /// Blank lines and `#` comments are ignored.
    pub fn from_bad_event_file(path: &Path) -> Result<Self, AppError> {
        let text = fs::read_to_string(path)
            .map_err(|e| AppError::input(format!("Failed to read bad-event list '{}': {e}", path.display())))?;
        Ok(Self::with_bad_events(parse_bad_events(&text)?))
    }

    pub fn bad_event_count(&self) -> usize {
        self.bad.len()
    }

    /// Decide whether `event` should be processed. Simulation always passes.
    pub fn check(&mut self, event: &Event) -> Result<(), Rejection> {
        if !event.is_data {
            return Ok(());
        }
        if self.bad.contains(&event.id) {
            return Err(Rejection::BadCalibration);
        }
        if !self.seen.insert(event.id) {
            return Err(Rejection::Duplicate);
        }
        Ok(())
    }
}

fn parse_bad_events(text: &str) -> Result<Vec<EventId>, AppError> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let parsed = match fields.as_slice() {
            [run, event, lumi] => run
                .parse::<u32>()
                .ok()
                .zip(event.parse::<u64>().ok())
                .zip(lumi.parse::<u32>().ok())
                .map(|((run, event), lumi)| EventId { run, lumi, event }),
            _ => None,
        };
        let id = parsed.ok_or_else(|| {
            AppError::input(format!("Bad-event list line {}: expected 'run event lumi', got '{line}'", idx + 1))
        })?;
        out.push(id);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MissingEnergy;
    use crate::math::lorentz::FourMomentum;

    fn event(run: u32, lumi: u32, n: u64, is_data: bool) -> Event {
        Event {
            id: EventId { run, lumi, event: n },
            is_data,
            weight: 1.0,
            jets: Vec::new(),
            btag: Vec::new(),
            parton: None,
            lepton: FourMomentum::default(),
            met: MissingEnergy::default(),
        }
    }

    #[test]
    fn data_duplicates_are_rejected_once_seen() {
        let mut f = EventFilter::new();
        assert_eq!(f.check(&event(1, 2, 3, true)), Ok(()));
        assert_eq!(f.check(&event(1, 2, 3, true)), Err(Rejection::Duplicate));
        assert_eq!(f.check(&event(1, 2, 4, true)), Ok(()));
        // Same event number in a different lumi section is a different event.
        assert_eq!(f.check(&event(1, 3, 3, true)), Ok(()));
    }

    #[test]
    fn simulation_is_never_filtered() {
        let mut f = EventFilter::with_bad_events([EventId { run: 1, lumi: 2, event: 3 }]);
        assert_eq!(f.check(&event(1, 2, 3, false)), Ok(()));
        assert_eq!(f.check(&event(1, 2, 3, false)), Ok(()));
        assert_eq!(f.check(&event(1, 2, 3, true)), Err(Rejection::BadCalibration));
    }

    #[test]
    fn bad_event_file_uses_run_event_lumi_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        std::fs::write(&path, "# run event lumi\n190645 1234567 12\n\n190703  42 7\n").unwrap();
        let f = EventFilter::from_bad_event_file(&path).unwrap();
        assert_eq!(f.bad_event_count(), 2);
        let mut f = f;
        assert_eq!(f.check(&event(190645, 12, 1234567, true)), Err(Rejection::BadCalibration));
        assert_eq!(f.check(&event(190645, 1234567, 12, true)), Ok(()));
    }

    #[test]
    fn malformed_bad_event_line_is_input_error() {
        let err = parse_bad_events("1 2\n").unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(parse_bad_events("1 x 3").is_err());
    }
}
