// Licensed under the Apache-2.0 license

use std::cell::{Cell, RefCell};
use std::fmt::Display;
use std::io::{LineWriter, Write};
use std::rc::Rc;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExitStatus {
    Passed,
    Failed,
}

/// Cycle count, right-aligned with thousands separators
struct PrettyU64(u64);
impl Display for PrettyU64 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let digits = self.0.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        write!(f, "{grouped:>11}")
    }
}

/// One trace entry
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TraceLine {
    pub cycle: u64,
    pub text: String,
}

impl Display for TraceLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", PrettyU64(self.cycle), self.text)
    }
}

struct OutputSinkImpl {
    exit_status: Cell<Option<ExitStatus>>,
    lines: RefCell<Vec<TraceLine>>,
    log_writer: RefCell<LineWriter<Box<dyn Write>>>,
    now: Cell<u64>,
}

/// Shared handle the model writes its trace through
#[derive(Clone)]
pub struct OutputSink(Rc<OutputSinkImpl>);
impl OutputSink {
    pub fn set_now(&self, now: u64) {
        self.0.now.set(now);
    }

    pub fn now(&self) -> u64 {
        self.0.now.get()
    }

    /// Append one trace line stamped with the current cycle, and echo it to
    /// the log writer.
    pub fn push_line(&self, text: &str) {
        let line = TraceLine {
            cycle: self.now(),
            text: text.into(),
        };
        let _ = writeln!(self.0.log_writer.borrow_mut(), "{line}");
        self.0.lines.borrow_mut().push(line);
    }

    pub fn set_exit_status(&self, status: ExitStatus) {
        let banner = match status {
            ExitStatus::Passed => "* TESTCASE PASSED",
            ExitStatus::Failed => "* TESTCASE FAILED",
        };
        let _ = writeln!(self.0.log_writer.borrow_mut(), "{banner}");
        self.0.exit_status.set(Some(status));
    }
}

/// Trace of a model run
pub struct Output {
    sink: OutputSink,
}

impl Output {
    pub fn new(log_writer: impl Write + 'static) -> Self {
        Self::new_internal(Box::new(log_writer))
    }

    pub(crate) fn new_internal(log_writer: Box<dyn Write>) -> Self {
        Self {
            sink: OutputSink(Rc::new(OutputSinkImpl {
                exit_status: Cell::new(None),
                lines: RefCell::new(Vec::new()),
                log_writer: RefCell::new(LineWriter::new(log_writer)),
                now: Cell::new(0),
            })),
        }
    }

    pub fn sink(&self) -> &OutputSink {
        &self.sink
    }

    /// Text of every line captured so far, one per line
    pub fn peek(&self) -> String {
        self.sink
            .0
            .lines
            .borrow()
            .iter()
            .map(|line| format!("{}\n", line.text))
            .collect()
    }

    /// Remove and return the captured lines
    pub fn take(&mut self) -> Vec<TraceLine> {
        self.sink.0.lines.take()
    }

    /// Cycle of the first captured line containing `term`
    pub fn cycle_of(&self, term: &str) -> Option<u64> {
        self.sink
            .0
            .lines
            .borrow()
            .iter()
            .find(|line| line.text.contains(term))
            .map(|line| line.cycle)
    }

    /// Returns true once the run has reached a final verdict
    pub fn exit_requested(&self) -> bool {
        self.exit_status().is_some()
    }

    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.sink.0.exit_status.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Log(Rc<RefCell<Vec<u8>>>);

    impl Log {
        fn into_string(self) -> String {
            String::from_utf8(self.0.take()).unwrap()
        }
    }

    impl Write for Log {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_pretty_u64() {
        assert_eq!(PrettyU64(0).to_string(), "          0");
        assert_eq!(PrettyU64(999).to_string(), "        999");
        assert_eq!(PrettyU64(4_800).to_string(), "      4,800");
        assert_eq!(PrettyU64(9_608).to_string(), "      9,608");
        assert_eq!(PrettyU64(1_000_001).to_string(), "  1,000,001");
        assert_eq!(PrettyU64(1_999_999_999).to_string(), "1,999,999,999");
    }

    #[test]
    fn test_lines_are_stamped() {
        let log = Log::default();
        let mut out = Output::new(log.clone());

        out.sink().push_line("boot 0");
        out.sink().set_now(4_800);
        out.sink().push_line("class A entered Phase1");

        assert_eq!(out.peek(), "boot 0\nclass A entered Phase1\n");
        assert_eq!(out.cycle_of("Phase1"), Some(4_800));
        assert_eq!(out.cycle_of("Phase2"), None);
        assert_eq!(
            out.take(),
            vec![
                TraceLine {
                    cycle: 0,
                    text: "boot 0".into()
                },
                TraceLine {
                    cycle: 4_800,
                    text: "class A entered Phase1".into()
                },
            ]
        );
        assert_eq!(out.peek(), "");

        drop(out);
        assert_eq!(
            log.into_string(),
            "          0 boot 0\n      4,800 class A entered Phase1\n"
        );
    }

    #[test]
    fn test_exit_status() {
        let log = Log::default();
        let out = Output::new(log.clone());
        assert!(!out.exit_requested());

        out.sink().push_line("done");
        out.sink().set_exit_status(ExitStatus::Passed);
        assert_eq!(out.exit_status(), Some(ExitStatus::Passed));
        drop(out);
        assert_eq!(
            log.into_string(),
            "          0 done\n* TESTCASE PASSED\n"
        );
    }
}
