//! Update payload
//!
//! The configured template is never mutated. Each run clones it into an
//! [`InboxPayload`], which can only be created with a `DefaultValue`, so no
//! per-employee body can leave without one.

use serde_json::{Map, Value};
use std::fmt;

/// Payload key holding the pushed mobile inbox search
pub const DEFAULT_VALUE_KEY: &str = "DefaultValue";

/// Payload key holding the employee being updated
pub const EMPLOYEE_SID_KEY: &str = "EmployeeSid";

/// Static payload fields from the config file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadTemplate {
    fields: Map<String, Value>,
}

impl PayloadTemplate {
    /// Wrap the configured fields
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Start a run's payload with the reference user's default search
    pub fn with_default_value(&self, default_value: Value) -> InboxPayload {
        let mut fields = self.fields.clone();
        fields.insert(DEFAULT_VALUE_KEY.to_string(), default_value);
        InboxPayload { fields }
    }

    /// Configured fields
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// Payload of one run, `DefaultValue` already set
#[derive(Debug, Clone, PartialEq)]
pub struct InboxPayload {
    fields: Map<String, Value>,
}

impl InboxPayload {
    /// The pushed default search
    pub fn default_value(&self) -> &Value {
        self.fields.get(DEFAULT_VALUE_KEY).unwrap_or(&Value::Null)
    }

    /// Point the payload at `employee_sid` and return the request body
    pub fn for_employee(&mut self, employee_sid: i64) -> &Map<String, Value> {
        self.fields
            .insert(EMPLOYEE_SID_KEY.to_string(), Value::from(employee_sid));
        &self.fields
    }

    /// Current fields
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl fmt::Display for InboxPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.fields) {
            Ok(json) => f.write_str(&json),
            Err(_) => Err(fmt::Error),
        }
    }
}
