//! Console collaborators: prompting for targets and rendering ramp progress.

use ramp_spine::{
    CycleOutcome, EnvelopeViolation, PowerEnvelope, ProgressSink, SessionEnd, SessionSummary,
    TargetSource,
};
use std::fmt;
use std::io::{self, BufRead, Write};
use tracing::warn;

const RULE_WIDTH: usize = 40;
const BANNER_WIDTH: usize = 50;

/// Reads targets and continue answers from a line-oriented reader.
pub struct ConsoleInput<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> ConsoleInput<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Prints `text` and reads one line. `None` on end of input.
    fn prompt(&mut self, text: &str) -> io::Result<Option<String>> {
        write!(self.writer, "{text}")?;
        self.writer.flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Prompts until an in-range target is entered or the user quits.
    pub fn read_target(&mut self, envelope: &PowerEnvelope) -> io::Result<Option<f64>> {
        let text = format!(
            "\nEnter desired power setting ({}-{} w-s) or 'q' to quit: ",
            envelope.min(),
            envelope.max()
        );
        loop {
            let Some(entry) = self.prompt(&text)? else {
                return Ok(None);
            };
            if entry.eq_ignore_ascii_case("q") {
                return Ok(None);
            }

            match entry.parse::<f64>() {
                Ok(power) if envelope.validate(power) => return Ok(Some(power)),
                Ok(_) => writeln!(self.writer, "{}", range_error(envelope))?,
                Err(_) => writeln!(self.writer, "Error: Please enter a valid number")?,
            }
        }
    }

    pub fn read_continue(&mut self) -> io::Result<bool> {
        let answer = self.prompt("\nDo you want to run another cycle? (y/n): ")?;
        Ok(answer.is_some_and(|a| a.eq_ignore_ascii_case("y")))
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

impl<R: BufRead, W: Write> TargetSource for ConsoleInput<R, W> {
    fn next_target(&mut self, envelope: &PowerEnvelope) -> Option<f64> {
        match self.read_target(envelope) {
            Ok(target) => target,
            Err(e) => {
                warn!(error = %e, "Failed to read target, ending session");
                None
            }
        }
    }

    fn continue_session(&mut self) -> bool {
        match self.read_continue() {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "Failed to read continue answer, ending session");
                false
            }
        }
    }
}

fn range_error(envelope: &PowerEnvelope) -> String {
    format!(
        "Error: Power setting must be between {} and {} w-s",
        envelope.min(),
        envelope.max()
    )
}

/// Renders progress on a single rewritten line and a summary per cycle.
pub struct ConsoleDisplay<W> {
    writer: W,
    envelope: PowerEnvelope,
}

impl<W: Write + Send> ConsoleDisplay<W> {
    pub fn new(writer: W, envelope: PowerEnvelope) -> Self {
        Self { writer, envelope }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn emit(&mut self, args: fmt::Arguments<'_>) {
        let res = self
            .writer
            .write_fmt(args)
            .and_then(|()| self.writer.flush());
        if let Err(e) = res {
            warn!(error = %e, "Console write failed");
        }
    }
}

impl<W: Write + Send> ProgressSink for ConsoleDisplay<W> {
    fn cycle_started(&mut self, target: f64) {
        let rule = "-".repeat(RULE_WIDTH);
        self.emit(format_args!(
            "Starting transducer operation...\nTarget power: {target:.1} w-s\n{rule}\n"
        ));
    }

    fn on_progress(&mut self, current: f64) {
        self.emit(format_args!("Current power: {current:6.1} w-s\r"));
    }

    fn report(&mut self, outcome: &CycleOutcome) {
        let rule = "=".repeat(RULE_WIDTH);
        if outcome.interrupted {
            self.emit(format_args!("\nEMERGENCY STOP ACTIVATED!"));
        }
        self.emit(format_args!(
            "\n{rule}\nTRANSDUCER STOPPED at {:.1} w-s\nTarget power reached: {}\n{rule}\n",
            outcome.final_power, outcome.reached_target
        ));
    }

    fn rejected(&mut self, violation: &EnvelopeViolation) {
        let message = match violation {
            EnvelopeViolation::NonFinite { .. } => "Error: Please enter a valid number".to_string(),
            _ => range_error(&self.envelope),
        };
        self.emit(format_args!("{message}\n"));
    }
}

pub fn write_banner<W: Write>(writer: &mut W, envelope: &PowerEnvelope) -> io::Result<()> {
    let rule = "=".repeat(BANNER_WIDTH);
    writeln!(writer, "{rule}")?;
    writeln!(writer, "    TRANSDUCER POWER CONTROLLER")?;
    writeln!(writer, "{rule}")?;
    writeln!(writer, "Power Range: {} - {} w-s", envelope.min(), envelope.max())?;
    writeln!(writer, "Press Ctrl+C for emergency stop")?;
    writer.flush()
}

pub fn write_session_end<W: Write>(writer: &mut W, summary: &SessionSummary) -> io::Result<()> {
    match summary.end {
        SessionEnd::Quit => writeln!(writer, "Exiting program...")?,
        SessionEnd::Declined => {}
        SessionEnd::Interrupted => write_emergency_termination(writer)?,
    }
    writeln!(writer, "Program ended.")?;
    writer.flush()
}

/// Termination notice for an emergency stop, also used when the interrupt
/// arrives while no cycle is running.
pub fn write_emergency_termination<W: Write>(writer: &mut W) -> io::Result<()> {
    writeln!(writer, "\n{}", "=".repeat(BANNER_WIDTH))?;
    writeln!(writer, "EMERGENCY STOP - Program terminated by user")
}
