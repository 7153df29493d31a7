//! Rendering of workflow events and summaries, plus tracing bootstrap.

use std::io::IsTerminal;

use crate::event_log::logger::ExecutionSummary;
use crate::event_log::event::WorkflowEvent;

pub const CONTEXT_COLOR: &str = "\x1b[32m"; // green
pub const LINE_COLOR: &str = "\x1b[35m"; // magenta
pub const RESET_COLOR: &str = "\x1b[0m";

/// Formatter color mode for telemetry output.
///
/// Controls whether ANSI color codes are included in formatted output:
/// - [`FormatterMode::Auto`]: detects TTY capability via `stderr.is_terminal()`
/// - [`FormatterMode::Colored`]: always include color codes
/// - [`FormatterMode::Plain`]: never include color codes (for logs/files)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatterMode {
    /// Auto-detect TTY capability.
    #[default]
    Auto,
    /// Always include ANSI color codes.
    Colored,
    /// Never include ANSI color codes.
    Plain,
}

impl FormatterMode {
    /// Returns true if this mode should use colored output.
    ///
    /// For `Auto` mode, performs TTY detection on each call.
    #[must_use]
    pub fn is_colored(&self) -> bool {
        match self {
            FormatterMode::Auto => std::io::stderr().is_terminal(),
            FormatterMode::Colored => true,
            FormatterMode::Plain => false,
        }
    }
}

/// Renders telemetry items into strings a sink can write.
pub trait TelemetryFormatter: Send + Sync {
    /// Renders one event as a single line (no trailing newline).
    fn render_event(&self, event: &WorkflowEvent) -> String;
    /// Renders an execution summary as a multi-line block.
    fn render_summary(&self, summary: &ExecutionSummary) -> String;
}

/// Plain text formatter with optional ANSI color codes.
///
/// # Examples
///
/// ```rust
/// use ideaforge::telemetry::{FormatterMode, PlainFormatter, TelemetryFormatter};
/// use ideaforge::event_log::WorkflowEvent;
///
/// let formatter = PlainFormatter::plain();
/// let line = formatter.render_event(&WorkflowEvent::workflow_end(12));
/// assert!(line.contains("WORKFLOW_END"));
/// assert!(!line.contains("\x1b["));
/// ```
pub struct PlainFormatter {
    mode: FormatterMode,
}

impl PlainFormatter {
    /// Creates a formatter with auto-detected color mode.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mode: FormatterMode::Auto,
        }
    }

    /// Creates a formatter with an explicit color mode.
    #[must_use]
    pub fn with_mode(mode: FormatterMode) -> Self {
        Self { mode }
    }

    /// Creates a formatter that never emits color codes.
    #[must_use]
    pub fn plain() -> Self {
        Self::with_mode(FormatterMode::Plain)
    }
}

impl Default for PlainFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryFormatter for PlainFormatter {
    fn render_event(&self, event: &WorkflowEvent) -> String {
        if self.mode.is_colored() {
            format!("{LINE_COLOR}{event}{RESET_COLOR}")
        } else {
            event.to_string()
        }
    }

    fn render_summary(&self, summary: &ExecutionSummary) -> String {
        let use_color = self.mode.is_colored();
        let (ctx, line, reset) = if use_color {
            (CONTEXT_COLOR, LINE_COLOR, RESET_COLOR)
        } else {
            ("", "", "")
        };

        let mut out = format!(
            "{ctx}workflow {} (session {}){reset}\n",
            summary.workflow_id, summary.session_id
        );
        out.push_str(&format!(
            "{line}  events: {} | errors: {} | state updates: {}{reset}\n",
            summary.event_count, summary.error_count, summary.state_update_count
        ));
        if let Some(total) = summary.total_duration_ms {
            out.push_str(&format!("{line}  total: {total}ms{reset}\n"));
        }

        // Sort nodes so the rendering is stable across runs.
        let mut nodes: Vec<_> = summary.node_stats.iter().collect();
        nodes.sort_by_key(|(node, _)| node.as_str());
        for (node, stats) in nodes {
            out.push_str(&format!(
                "{line}  {node}: {} run(s), avg {:.1}ms{reset}\n",
                stats.count, stats.avg_duration_ms
            ));
        }
        out
    }
}

/// Installs a process-wide tracing subscriber for diagnostics.
///
/// Filter via `RUST_LOG` (defaults to `info`); includes the
/// `tracing-error` layer so spans are captured alongside errors. Safe to
/// call more than once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_error::ErrorLayer::default())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_log::WorkflowLogger;
    use crate::types::NodeKind;

    #[test]
    fn plain_mode_never_colors() {
        assert!(!FormatterMode::Plain.is_colored());
        assert!(FormatterMode::Colored.is_colored());
    }

    #[test]
    fn summary_rendering_is_stable() {
        let logger = WorkflowLogger::new("run_1", "sess_1");
        logger.record(WorkflowEvent::node_enter(NodeKind::ProcessUserTurn));
        logger.record(WorkflowEvent::node_exit(NodeKind::ProcessUserTurn, 4, &["messages"]));
        logger.finish(9);

        let rendered = PlainFormatter::plain().render_summary(&logger.execution_summary());
        assert!(rendered.contains("workflow run_1 (session sess_1)"));
        assert!(rendered.contains("process_user_turn: 1 run(s)"));
        assert!(rendered.contains("total: 9ms"));
        assert!(!rendered.contains("\x1b["));
    }
}
