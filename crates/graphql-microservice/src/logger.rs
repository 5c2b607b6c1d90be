//! Logger capability detection.
//!
//! A logger is anything that can be called at the four basic severities:
//! debug, info, warn and error. Callers hand the factory a
//! [`LoggerCandidate`], a record of those four callables; it only counts as
//! a logger once every member is present, see [`is_logger`].

use std::{fmt, sync::Arc};

/// A single log callable.
pub type LogFn = Arc<dyn Fn(&str) + Send + Sync>;

/// The four basic log functions.
pub trait Logger: Send + Sync + 'static {
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// A value offered as a logger. Any member may be missing.
#[derive(Clone, Default)]
pub struct LoggerCandidate {
    debug: Option<LogFn>,
    info: Option<LogFn>,
    warn: Option<LogFn>,
    error: Option<LogFn>,
}

impl LoggerCandidate {
    pub fn new() -> Self {
        Self::default()
    }

    /// A candidate forwarding every level to `tracing`.
    pub fn tracing() -> Self {
        Self::from_logger(Arc::new(TracingLogger))
    }

    pub fn from_logger<L: Logger>(logger: Arc<L>) -> Self {
        let debug = logger.clone();
        let info = logger.clone();
        let warn = logger.clone();

        Self::new()
            .with_debug(move |message| debug.debug(message))
            .with_info(move |message| info.info(message))
            .with_warn(move |message| warn.warn(message))
            .with_error(move |message| logger.error(message))
    }

    #[must_use]
    pub fn with_debug(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.debug = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_info(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.info = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_warn(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.warn = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_error(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.error = Some(Arc::new(f));
        self
    }

    /// Views the candidate as a logger, if it passes [`is_logger`].
    pub fn as_logger(&self) -> Option<ContextLogger<'_>> {
        if !is_logger(Some(self)) {
            return None;
        }

        Some(ContextLogger {
            debug: self.debug.as_ref()?,
            info: self.info.as_ref()?,
            warn: self.warn.as_ref()?,
            error: self.error.as_ref()?,
        })
    }
}

impl<L: Logger> From<Arc<L>> for LoggerCandidate {
    fn from(logger: Arc<L>) -> Self {
        Self::from_logger(logger)
    }
}

impl fmt::Debug for LoggerCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerCandidate")
            .field("debug", &self.debug.is_some())
            .field("info", &self.info.is_some())
            .field("warn", &self.warn.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}

/// Returns true if the candidate exposes all four log functions.
///
/// Members are checked in the order debug, info, warn, error and the check
/// stops at the first missing one.
pub fn is_logger(candidate: Option<&LoggerCandidate>) -> bool {
    let Some(candidate) = candidate else {
        return false;
    };

    if candidate.debug.is_none() {
        return false;
    }

    if candidate.info.is_none() {
        return false;
    }

    if candidate.warn.is_none() {
        return false;
    }

    candidate.error.is_some()
}

/// A validated logger borrowed from a [`LoggerCandidate`].
#[derive(Clone, Copy)]
pub struct ContextLogger<'a> {
    debug: &'a LogFn,
    info: &'a LogFn,
    warn: &'a LogFn,
    error: &'a LogFn,
}

impl ContextLogger<'_> {
    pub fn debug(&self, message: &str) {
        (self.debug)(message);
    }

    pub fn info(&self, message: &str) {
        (self.info)(message);
    }

    pub fn warn(&self, message: &str) {
        (self.warn)(message);
    }

    pub fn error(&self, message: &str) {
        (self.error)(message);
    }
}

/// Forwards log calls to `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(target: "graphql_microservice::resolver", "{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "graphql_microservice::resolver", "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "graphql_microservice::resolver", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "graphql_microservice::resolver", "{message}");
    }
}
