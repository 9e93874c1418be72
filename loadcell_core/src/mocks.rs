//! Test and helper load cells for loadcell_core.
use std::time::Duration;

use loadcell_traits::LoadCell;

/// Replays a fixed list of readings, then repeats the last one (or times
/// out forever when built with `then_timeout`).
#[derive(Debug, Clone)]
pub struct ScriptedCell {
    values: Vec<i32>,
    pos: usize,
    timeout_after: bool,
}

impl ScriptedCell {
    pub fn new(values: impl Into<Vec<i32>>) -> Self {
        Self {
            values: values.into(),
            pos: 0,
            timeout_after: false,
        }
    }

    pub fn constant(value: i32) -> Self {
        Self::new(vec![value])
    }

    #[must_use]
    pub fn then_timeout(mut self) -> Self {
        self.timeout_after = true;
        self
    }
}

impl LoadCell for ScriptedCell {
    fn read_raw(
        &mut self,
        _timeout: Duration,
    ) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        if let Some(&v) = self.values.get(self.pos) {
            self.pos += 1;
            return Ok(v);
        }
        match self.values.last() {
            Some(&v) if !self.timeout_after => Ok(v),
            _ => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "scripted timeout",
            ))),
        }
    }
}

/// A load cell that never becomes ready.
pub struct NeverReady;

impl LoadCell for NeverReady {
    fn read_raw(
        &mut self,
        _timeout: Duration,
    ) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "data-ready timeout",
        )))
    }
}
