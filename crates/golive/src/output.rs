//! Colored terminal output on stderr.

use console::{Style, Term};

/// Width of the label column in [`Output::field`].
const LABEL_WIDTH: usize = 12;

/// Terminal output formatter.
pub(crate) struct Output {
    term: Term,
    label: Style,
    url: Style,
    success: Style,
    warning: Style,
    error: Style,
    detail: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            label: Style::new().bold(),
            url: Style::new().cyan().bold().underlined(),
            success: Style::new().green(),
            warning: Style::new().yellow(),
            error: Style::new().red().bold(),
            detail: Style::new().dim(),
        }
    }

    /// Print an aligned `label  value` line.
    pub(crate) fn field(&self, label: &str, value: &str) {
        let label = format!("{label:<width$}", width = LABEL_WIDTH);
        self.line(&format!("{}{value}", self.label.apply_to(label)));
    }

    /// Print the address browsers should open.
    pub(crate) fn url(&self, url: &str) {
        self.line(&format!("\n  {}\n", self.url.apply_to(url)));
    }

    pub(crate) fn success(&self, msg: &str) {
        self.line(&self.success.apply_to(msg).to_string());
    }

    pub(crate) fn warning(&self, msg: &str) {
        self.line(&self.warning.apply_to(msg).to_string());
    }

    pub(crate) fn error(&self, msg: &str) {
        self.line(&self.error.apply_to(msg).to_string());
    }

    /// Print a low-priority message (dimmed).
    pub(crate) fn detail(&self, msg: &str) {
        self.line(&self.detail.apply_to(msg).to_string());
    }

    fn line(&self, text: &str) {
        let _ = self.term.write_line(text);
    }
}
