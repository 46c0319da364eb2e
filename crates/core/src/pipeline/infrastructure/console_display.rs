use std::io::Write;

use crate::pipeline::emotion_pipeline::TickOutcome;
use crate::pipeline::live_session::DisplaySink;
use crate::presentation::probability_renderer::{render_json, render_text};
use crate::shared::frame::Frame;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Probability table followed by a blank line.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Writes each tick's probabilities to a byte stream (stdout in the CLI).
///
/// Stale outcomes are re-shown unchanged; skipped ticks print nothing.
pub struct ConsoleDisplay<W: Write> {
    out: W,
    format: OutputFormat,
}

impl ConsoleDisplay<std::io::Stdout> {
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(std::io::stdout(), format)
    }
}

impl<W: Write> ConsoleDisplay<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self { out, format }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> DisplaySink for ConsoleDisplay<W> {
    fn show(&mut self, frame: &Frame, outcome: &TickOutcome) -> Result<(), Box<dyn std::error::Error>> {
        let Some(probabilities) = outcome.probabilities() else {
            return Ok(());
        };
        match self.format {
            OutputFormat::Text => writeln!(self.out, "{}\n", render_text(probabilities))?,
            OutputFormat::Json => writeln!(self.out, "{}", render_json(frame.index(), probabilities)?)?,
        }
        self.out.flush()?;
        Ok(())
    }
}
