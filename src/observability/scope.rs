//! Begin/complete logging scopes
//!
//! A scope logs `{name}_BEGIN` on creation, `{name}_COMPLETE` on explicit
//! completion, and `{name}_ABORTED` at ERROR level if it is dropped without
//! completing - an abandoned scope is always worth a log line.

use std::cell::Cell;

use super::logger::Logger;

/// A lifecycle logging scope around one operation
pub struct ObservationScope<'a> {
    name: &'a str,
    completed: Cell<bool>,
    fields: Vec<(&'a str, String)>,
}

impl<'a> ObservationScope<'a> {
    /// Create a scope, logging `{name}_BEGIN`
    pub fn new(name: &'a str) -> Self {
        Self::with_fields(name, &[])
    }

    /// Create a scope with context fields carried into every event
    pub fn with_fields(name: &'a str, fields: &[(&'a str, &str)]) -> Self {
        let scope = Self {
            name,
            completed: Cell::new(false),
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
        };
        scope.emit("BEGIN", &[]);
        scope
    }

    /// Mark the scope completed, logging `{name}_COMPLETE`
    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    /// Mark the scope completed with extra result fields
    pub fn complete_with_fields(self, extra: &[(&str, &str)]) {
        self.completed.set(true);
        self.emit("COMPLETE", extra);
    }

    fn emit(&self, suffix: &str, extra: &[(&str, &str)]) {
        let event = format!("{}_{}", self.name, suffix);
        let mut fields: Vec<(&str, &str)> =
            self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        fields.extend_from_slice(extra);
        if suffix == "ABORTED" {
            Logger::error(&event, &fields);
        } else {
            Logger::info(&event, &fields);
        }
    }
}

impl Drop for ObservationScope<'_> {
    fn drop(&mut self) {
        if !self.completed.get() {
            self.emit("ABORTED", &[]);
        }
    }
}
