use crate::errors::SequenceError;
use crate::line::{DialogueLine, OptionLine};
use crate::{ExecutionState, Sequence, SuspendReason};

/// Something that shows dialogue and decides how it continues.
pub trait DialogueReader {
    /// Shows a line. Returning false leaves the sequence parked on it.
    fn read_line(&mut self, line: &DialogueLine) -> bool;

    /// Shows a set of options and returns the target node of the chosen one,
    /// or `None` to leave the sequence waiting.
    fn read_options(&mut self, options: &OptionLine) -> Option<String>;

    fn read_end(&mut self) {}
}

impl Sequence {
    /// Starts the sequence and feeds it to `reader` until the dialogue ends or
    /// the reader stops resuming it.
    pub fn run_with<R>(&mut self, reader: &mut R) -> Result<ExecutionState, SequenceError>
    where
        R: DialogueReader + ?Sized,
    {
        let mut reason = self.start()?;
        loop {
            reason = match reason {
                SuspendReason::Line(line) => {
                    if !reader.read_line(&line) {
                        break;
                    }
                    self.continue_dialogue()?
                }
                SuspendReason::Options(options) => match reader.read_options(&options) {
                    Some(target) => self.choose(&target)?,
                    None => break,
                },
                SuspendReason::DialogueComplete => {
                    reader.read_end();
                    break;
                }
            };
        }
        Ok(self.execution_state())
    }
}
