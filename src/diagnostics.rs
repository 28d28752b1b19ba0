//! Per-run diagnostics context.
//!
//! Every stage reports into a [`Diagnostics`] value handed to it by the
//! caller instead of flipping process-wide flags, so independent runs (for
//! example parallel tests) never observe each other's errors.

use log::debug;

use crate::error::KixError;

#[derive(Debug, Default)]
pub struct Diagnostics {
    reports: Vec<KixError>,
    had_error: bool,
    had_runtime_error: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic. Flags are derived from the variant; warnings
    /// set neither, and anything raised while running counts as runtime.
    pub fn report(&mut self, err: KixError) {
        debug!("Reporting diagnostic: {}", err);

        if err.is_static() {
            self.had_error = true;
        } else if !matches!(err, KixError::Lint { .. }) {
            self.had_runtime_error = true;
        }

        self.reports.push(err);
    }

    /// Any lexical, syntax or resolution error since the last [`reset`](Self::reset)?
    pub fn had_error(&self) -> bool {
        self.had_error
    }

    /// Clears the compile-time error flag between REPL lines. The runtime
    /// flag is sticky for the session.
    pub fn reset(&mut self) {
        self.had_error = false;
    }

    /// All diagnostics not yet drained, in report order.
    pub fn reports(&self) -> &[KixError] {
        &self.reports
    }

    /// Hand pending diagnostics to the caller for printing. Flags are kept.
    pub fn drain(&mut self) -> Vec<KixError> {
        std::mem::take(&mut self.reports)
    }

    /// Process exit status for everything reported so far.
    pub fn exit_code(&self) -> i32 {
        if self.had_error {
            65
        } else if self.had_runtime_error {
            70
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_error_wins_exit_code() {
        let mut diags = Diagnostics::new();
        diags.report(KixError::Runtime {
            message: "boom".into(),
            line: 1,
        });
        assert_eq!(diags.exit_code(), 70);

        diags.report(KixError::lex(2, "Unterminated string."));
        assert_eq!(diags.exit_code(), 65);

        diags.reset();
        assert_eq!(diags.exit_code(), 70);
    }

    #[test]
    fn lint_does_not_set_error_flag() {
        let mut diags = Diagnostics::new();
        diags.report(KixError::Lint {
            message: "Variable defined but not used.".into(),
            location: " at 'a'".into(),
            line: 1,
        });
        assert!(!diags.had_error());
        assert_eq!(diags.exit_code(), 0);
        assert_eq!(diags.drain().len(), 1);
        assert!(diags.reports().is_empty());
    }

    #[test]
    fn io_failure_while_running_is_a_runtime_error() {
        let mut diags = Diagnostics::new();
        diags.report(KixError::Io("broken pipe".into()));
        assert!(!diags.had_error());
        assert_eq!(diags.exit_code(), 70);
    }
}
