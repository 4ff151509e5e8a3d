//! Event tracking for optimizer passes.
//!
//! Passes record what they did into an [`EventLog`]: statements removed,
//! copies propagated, nodes merged, and so on. The log is append-only and can
//! be recorded into through a shared reference, so a pass can collect its own
//! events locally and merge them into the context once it is done.
//!
//! Every event is also forwarded to the [`log`] facade at the moment it is
//! recorded. Warnings go to `log::warn!`, everything else to `log::debug!`.
//!
//! # Example
//!
//! ```rust
//! use shcore::compiler::{EventKind, EventLog};
//!
//! let log = EventLog::new();
//! log.record(EventKind::StatementRemoved)
//!     .pass("dead-code-elimination")
//!     .message("t2 := MUL t1, 2");
//! log.info("round finished");
//!
//! assert_eq!(log.len(), 2);
//! assert!(log.has(EventKind::StatementRemoved));
//! assert_eq!(log.transformations().count(), 1);
//! ```

use std::{collections::BTreeMap, fmt};

use strum::IntoStaticStr;

use crate::{analysis::CfgNodeId, ir::StmtId};

/// Kind of an optimizer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    /// A pass started running.
    PassStarted,
    /// A pass finished, its message says whether it changed anything.
    PassCompleted,
    /// The driver finished one round over all enabled passes.
    RoundCompleted,
    /// A dead statement was removed.
    StatementRemoved,
    /// A use of a copy was replaced by the copy's source.
    CopyPropagated,
    /// A temporary move was folded into its defining statement.
    MoveEliminated,
    /// A node was merged into its predecessor.
    BlocksMerged,
    /// An empty node was removed from the graph.
    BlockRemoved,
    /// A conditional edge that duplicated the follower was removed.
    EdgeRemoved,
    /// Branch guards were protected by marker statements.
    GuardsProtected,
    /// Free-form information.
    Info,
    /// Something unexpected that did not stop the pass.
    Warning,
}

impl EventKind {
    /// Returns true if this event reports on the optimizer rather than a
    /// change to the program.
    #[must_use]
    pub const fn is_diagnostic(self) -> bool {
        matches!(
            self,
            Self::PassStarted
                | Self::PassCompleted
                | Self::RoundCompleted
                | Self::GuardsProtected
                | Self::Info
                | Self::Warning
        )
    }

    /// Returns true if this event reports a change to the program.
    #[must_use]
    pub const fn is_transformation(self) -> bool {
        !self.is_diagnostic()
    }

    /// Returns a short human-readable description, used in summaries.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::PassStarted => "passes started",
            Self::PassCompleted => "passes completed",
            Self::RoundCompleted => "rounds completed",
            Self::StatementRemoved => "statements removed",
            Self::CopyPropagated => "copies propagated",
            Self::MoveEliminated => "moves eliminated",
            Self::BlocksMerged => "blocks merged",
            Self::BlockRemoved => "blocks removed",
            Self::EdgeRemoved => "edges removed",
            Self::GuardsProtected => "guards protected",
            Self::Info => "info messages",
            Self::Warning => "warnings",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name: &'static str = self.into();
        f.write_str(name)
    }
}

/// A single recorded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// What happened.
    pub kind: EventKind,
    /// The pass that recorded the event.
    pub pass: Option<&'static str>,
    /// The control graph node involved.
    pub node: Option<CfgNodeId>,
    /// The statement involved.
    pub stmt: Option<StmtId>,
    /// Free-form detail.
    pub message: String,
}

impl Event {
    fn new(kind: EventKind) -> Self {
        Self {
            kind,
            pass: None,
            node: None,
            stmt: None,
            message: String::new(),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind)?;
        if let Some(pass) = self.pass {
            write!(f, " {pass}")?;
        }
        if let Some(node) = self.node {
            write!(f, " @{node}")?;
        }
        if let Some(stmt) = self.stmt {
            write!(f, " {stmt}")?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

/// Builder for an event, records into its log when dropped.
pub struct EventBuilder<'a> {
    log: &'a EventLog,
    event: Option<Event>,
}

impl EventBuilder<'_> {
    /// Sets the pass that produced the event.
    pub fn pass(mut self, name: &'static str) -> Self {
        if let Some(event) = self.event.as_mut() {
            event.pass = Some(name);
        }
        self
    }

    /// Sets the control graph node the event refers to.
    pub fn node(mut self, node: CfgNodeId) -> Self {
        if let Some(event) = self.event.as_mut() {
            event.node = Some(node);
        }
        self
    }

    /// Sets the statement the event refers to.
    pub fn stmt(mut self, stmt: StmtId) -> Self {
        if let Some(event) = self.event.as_mut() {
            event.stmt = Some(stmt);
        }
        self
    }

    /// Sets the message and records the event.
    pub fn message(mut self, message: impl Into<String>) {
        if let Some(event) = self.event.as_mut() {
            event.message = message.into();
        }
    }
}

impl Drop for EventBuilder<'_> {
    fn drop(&mut self) {
        if let Some(event) = self.event.take() {
            self.log.push(event);
        }
    }
}

/// Append-only log of optimizer events.
pub struct EventLog {
    events: boxcar::Vec<Event>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self {
            events: boxcar::Vec::new(),
        }
    }
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts recording an event of `kind`.
    ///
    /// The event is stored when the returned builder is dropped, or when its
    /// message is set.
    pub fn record(&self, kind: EventKind) -> EventBuilder<'_> {
        EventBuilder {
            log: self,
            event: Some(Event::new(kind)),
        }
    }

    /// Records an informational message.
    pub fn info(&self, message: impl Into<String>) {
        self.record(EventKind::Info).message(message);
    }

    /// Records a warning.
    pub fn warn(&self, message: impl Into<String>) {
        self.record(EventKind::Warning).message(message);
    }

    /// Appends every event of `other`, keeping their order.
    ///
    /// The merged events were forwarded to the logger when first recorded
    /// and are not forwarded again.
    pub fn merge(&self, other: EventLog) {
        for (_, event) in other.events.iter() {
            self.events.push(event.clone());
        }
    }

    /// Removes and returns all events, leaving the log empty.
    pub fn take(&mut self) -> EventLog {
        EventLog {
            events: std::mem::replace(&mut self.events, boxcar::Vec::new()),
        }
    }

    /// Returns the number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.count()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over the events in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().map(|(_, event)| event)
    }

    /// Returns true if an event of `kind` was recorded.
    #[must_use]
    pub fn has(&self, kind: EventKind) -> bool {
        self.iter().any(|e| e.kind == kind)
    }

    /// Returns the number of events of `kind`.
    #[must_use]
    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.iter().filter(|e| e.kind == kind).count()
    }

    /// Iterates over the events of `kind`.
    pub fn filter_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> {
        self.iter().filter(move |e| e.kind == kind)
    }

    /// Iterates over the events that changed the program.
    pub fn transformations(&self) -> impl Iterator<Item = &Event> {
        self.iter().filter(|e| e.kind.is_transformation())
    }

    /// Returns a one-line summary of the transformations, such as
    /// `"3 statements removed, 1 copies propagated"`.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut counts: BTreeMap<EventKind, usize> = BTreeMap::new();
        for event in self.transformations() {
            *counts.entry(event.kind).or_default() += 1;
        }

        if counts.is_empty() {
            return "no changes".to_string();
        }

        counts
            .into_iter()
            .map(|(kind, count)| format!("{count} {}", kind.description()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn push(&self, event: Event) {
        if event.kind == EventKind::Warning {
            log::warn!("{event}");
        } else {
            log::debug!("{event}");
        }
        self.events.push(event);
    }
}

impl fmt::Debug for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl Clone for EventLog {
    fn clone(&self) -> Self {
        let events = boxcar::Vec::new();
        for event in self.iter() {
            events.push(event.clone());
        }
        Self { events }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_records_on_drop() {
        let log = EventLog::new();
        {
            let _builder = log.record(EventKind::BlocksMerged).node(CfgNodeId::new(3));
            assert!(log.is_empty());
        }
        assert_eq!(log.len(), 1);

        let event = log.iter().next().unwrap();
        assert_eq!(event.kind, EventKind::BlocksMerged);
        assert_eq!(event.node, Some(CfgNodeId::new(3)));
        assert!(event.message.is_empty());
    }

    #[test]
    fn test_merge_keeps_order() {
        let log = EventLog::new();
        log.info("first");

        let local = EventLog::new();
        local.record(EventKind::EdgeRemoved).message("second");
        local.warn("third");
        log.merge(local);

        let messages: Vec<_> = log.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
        assert_eq!(log.count_kind(EventKind::Warning), 1);
    }

    #[test]
    fn test_take_empties_log() {
        let mut log = EventLog::new();
        log.record(EventKind::StatementRemoved).message("a");
        let taken = log.take();
        assert!(log.is_empty());
        assert_eq!(taken.len(), 1);
    }

    #[test]
    fn test_summary_counts_transformations() {
        let log = EventLog::new();
        assert_eq!(log.summary(), "no changes");

        log.record(EventKind::PassStarted).pass("dead-code-elimination");
        log.record(EventKind::StatementRemoved).message("a");
        log.record(EventKind::StatementRemoved).message("b");
        log.record(EventKind::CopyPropagated).message("c");

        assert_eq!(log.summary(), "2 statements removed, 1 copies propagated");
        assert_eq!(log.filter_kind(EventKind::StatementRemoved).count(), 2);
        assert!(!log.has(EventKind::Warning));
    }

    #[test]
    fn test_event_display() {
        let log = EventLog::new();
        log.record(EventKind::BlockRemoved)
            .pass("empty-block-removal")
            .node(CfgNodeId::new(4))
            .message("empty");
        let event = log.iter().next().unwrap();
        assert_eq!(
            event.to_string(),
            "[block_removed] empty-block-removal @n4: empty"
        );
    }
}
