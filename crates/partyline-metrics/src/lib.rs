//! Metrics for the party-line admin client.
//!
//! This crate declares every metric the client records as a structured
//! [`Metric`] constant, so names, kinds and units live in one place.
//! It re-exports the `metrics` crate; recording is a no-op until the
//! application installs a recorder.
//!
//! # Example
//!
//! ```rust,ignore
//! use partyline_metrics::{describe_metrics, metric_defs};
//!
//! // Initialize metrics descriptions at startup
//! describe_metrics();
//!
//! metrics::counter!(metric_defs::COMMANDS_SENT.name, "token" => ".+chan").increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric (counter, gauge, or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
    /// A histogram for recording distributions.
    Histogram,
}

/// A metric declaration with its metadata.
///
/// # Example
///
/// ```rust
/// use partyline_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const RECONNECTS: Metric = Metric::counter("partyline.reconnects")
///     .with_description("Reconnects after a failed session")
///     .with_unit(Unit::Count);
///
/// assert_eq!(RECONNECTS.name, "partyline.reconnects");
/// assert_eq!(RECONNECTS.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g. "partyline.commands.sent").
    pub name: &'static str,
    /// The kind of metric (counter, gauge, histogram).
    pub kind: MetricKind,
    /// Human-readable description of the metric.
    pub description: &'static str,
    /// The unit of measurement (optional).
    pub unit: Option<Unit>,
}

impl Metric {
    const fn new(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
        }
    }

    /// Creates a new counter metric with the given name.
    pub const fn counter(name: &'static str) -> Self {
        Self::new(name, MetricKind::Counter)
    }

    /// Creates a new gauge metric with the given name.
    pub const fn gauge(name: &'static str) -> Self {
        Self::new(name, MetricKind::Gauge)
    }

    /// Creates a new histogram metric with the given name.
    pub const fn histogram(name: &'static str) -> Self {
        Self::new(name, MetricKind::Histogram)
    }

    /// Sets the description for the metric.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit for the metric.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Registers this metric's description with the metrics recorder.
    ///
    /// This should be called once at startup for each metric.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => {
                describe_counter!(self.name, self.description);
            }
            (MetricKind::Gauge, Some(unit)) => {
                describe_gauge!(self.name, unit, self.description);
            }
            (MetricKind::Gauge, None) => {
                describe_gauge!(self.name, self.description);
            }
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description);
            }
            (MetricKind::Histogram, None) => {
                describe_histogram!(self.name, self.description);
            }
        }
    }
}

/// All metric definitions for the client.
pub mod metric_defs {
    use super::{Metric, Unit};

    // ========================================================================
    // Session Metrics
    // ========================================================================

    /// Connection attempts (dial + handshake).
    pub const CONNECT_ATTEMPTS: Metric = Metric::counter("partyline.connect.attempts")
        .with_description("Connection attempts, including the login handshake")
        .with_unit(Unit::Count);

    /// Failed connection attempts.
    ///
    /// Labels: stage (dialing, awaiting_handle_prompt, ...)
    pub const CONNECT_FAILURES: Metric = Metric::counter("partyline.connect.failures")
        .with_description("Connection attempts that ended in a connection error")
        .with_unit(Unit::Count);

    /// Time from dial to join confirmation.
    pub const HANDSHAKE_DURATION: Metric = Metric::histogram("partyline.handshake.duration_ms")
        .with_description("Time from dialing to the join confirmation")
        .with_unit(Unit::Milliseconds);

    /// Whether a ready session is currently held (0 or 1).
    pub const SESSION_READY: Metric = Metric::gauge("partyline.session.ready")
        .with_description("1 while a logged-in session is held, 0 otherwise");

    // ========================================================================
    // Command Metrics
    // ========================================================================

    /// Commands written to the console.
    ///
    /// Labels: token
    pub const COMMANDS_SENT: Metric = Metric::counter("partyline.commands.sent")
        .with_description("Command lines written to the console")
        .with_unit(Unit::Count);

    /// Commands that did not produce a reply.
    ///
    /// Labels: token, kind (not_connected, io)
    pub const COMMANDS_FAILED: Metric = Metric::counter("partyline.commands.failed")
        .with_description("Commands that failed before a reply line was read")
        .with_unit(Unit::Count);

    /// Round-trip time of one command.
    ///
    /// Labels: token
    pub const COMMAND_LATENCY: Metric = Metric::histogram("partyline.command.latency_ms")
        .with_description("Time from writing a command to reading its reply")
        .with_unit(Unit::Milliseconds);

    /// All metrics, for bulk description.
    pub const ALL: &[&Metric] = &[
        &CONNECT_ATTEMPTS,
        &CONNECT_FAILURES,
        &HANDSHAKE_DURATION,
        &SESSION_READY,
        &COMMANDS_SENT,
        &COMMANDS_FAILED,
        &COMMAND_LATENCY,
    ];
}

/// Describes all metrics used by the client.
///
/// Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}
