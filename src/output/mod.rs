//! Result reporting
//!
//! - **text**: human report and the one-line-per-step batch format (stdout)
//! - **json**: whole-sweep report written to a file

pub mod json;
pub mod text;

use crate::stats::StepResult;
use crate::Result;
use std::io::Write;

/// Writes progress and per-step results in human or batch format
///
/// In batch mode only the result lines are printed, so the output can be fed
/// straight into a plotting script.
pub struct Reporter<W: Write> {
    out: W,
    batch: bool,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, batch: bool) -> Self {
        Self { out, batch }
    }

    pub fn is_batch(&self) -> bool {
        self.batch
    }

    /// `[+] <message>` progress line, human mode only
    pub fn status(&mut self, message: &str) -> Result<()> {
        if !self.batch {
            writeln!(self.out, "[+] {}", message)?;
        }
        Ok(())
    }

    /// Parameters of the step about to run, human mode only
    pub fn step_header(&mut self, start: u64, record_size: u64, total_size: u64) -> Result<()> {
        if !self.batch {
            text::write_step_header(&mut self.out, start, record_size, total_size)?;
        }
        Ok(())
    }

    /// Statistics of a finished step
    pub fn step_result(&mut self, step: &StepResult) -> Result<()> {
        if self.batch {
            writeln!(self.out, "{}", text::format_batch_line(step))?;
        } else {
            text::write_human_result(&mut self.out, step)?;
        }
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
