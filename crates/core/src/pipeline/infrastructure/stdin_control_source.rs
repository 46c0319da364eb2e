use std::io::BufRead;

use crossbeam_channel::{Receiver, TryRecvError};

use crate::pipeline::live_session::{ControlCommand, ControlSource};

/// Reads control lines on a background thread.
///
/// Every line is one command: `q` or `quit` quits, anything else (an
/// empty line included) switches to the next camera. End of input quits.
pub struct StdinControlSource {
    commands: Receiver<ControlCommand>,
}

impl StdinControlSource {
    pub fn spawn() -> std::io::Result<Self> {
        Self::from_reader(std::io::BufReader::new(std::io::stdin()))
    }

    pub fn from_reader<R: BufRead + Send + 'static>(reader: R) -> std::io::Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        std::thread::Builder::new()
            .name("control-input".into())
            .spawn(move || {
                for line in reader.lines() {
                    let Ok(line) = line else { break };
                    let command = parse_command(&line);
                    if tx.send(command).is_err() || command == ControlCommand::Quit {
                        return;
                    }
                }
                let _ = tx.send(ControlCommand::Quit);
            })?;
        Ok(Self { commands: rx })
    }
}

fn parse_command(line: &str) -> ControlCommand {
    let line = line.trim();
    if line.eq_ignore_ascii_case("q") || line.eq_ignore_ascii_case("quit") {
        ControlCommand::Quit
    } else {
        ControlCommand::SwitchCamera
    }
}

impl ControlSource for StdinControlSource {
    fn try_next(&mut self) -> Option<ControlCommand> {
        match self.commands.try_recv() {
            Ok(command) => Some(command),
            Err(TryRecvError::Empty) => None,
            // The reader always sends Quit before exiting, so this is only
            // reached after Quit was already delivered.
            Err(TryRecvError::Disconnected) => Some(ControlCommand::Quit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;
    use std::time::Duration;

    fn drain(source: &StdinControlSource) -> Vec<ControlCommand> {
        let mut out = Vec::new();
        while let Ok(c) = source.commands.recv_timeout(Duration::from_secs(2)) {
            out.push(c);
        }
        out
    }

    #[rstest]
    #[case::empty_line("", ControlCommand::SwitchCamera)]
    #[case::space(" ", ControlCommand::SwitchCamera)]
    #[case::word("next", ControlCommand::SwitchCamera)]
    #[case::q("q", ControlCommand::Quit)]
    #[case::upper_q("Q", ControlCommand::Quit)]
    #[case::quit(" quit ", ControlCommand::Quit)]
    fn test_parse_command(#[case] line: &str, #[case] expected: ControlCommand) {
        assert_eq!(parse_command(line), expected);
    }

    #[test]
    fn test_lines_become_commands_in_order() {
        let source = StdinControlSource::from_reader(Cursor::new("\n\nq\nignored\n")).unwrap();
        assert_eq!(
            drain(&source),
            vec![
                ControlCommand::SwitchCamera,
                ControlCommand::SwitchCamera,
                ControlCommand::Quit
            ]
        );
    }

    #[test]
    fn test_end_of_input_quits() {
        let source = StdinControlSource::from_reader(Cursor::new("\n")).unwrap();
        assert_eq!(
            drain(&source),
            vec![ControlCommand::SwitchCamera, ControlCommand::Quit]
        );
    }

    #[test]
    fn test_try_next_is_non_blocking() {
        let (_tx, rx) = crossbeam_channel::unbounded();
        let mut source = StdinControlSource { commands: rx };
        assert_eq!(source.try_next(), None);
    }
}
