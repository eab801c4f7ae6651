//! Lookup query templates
//!
//! Each template is a query prefix from the config file; the lookup value is
//! appended to it. Values come from the operator running the tool, not from
//! untrusted input.

use crate::error::AppError;
use serde::Deserialize;

/// The four lookups of a propagation run
#[derive(Debug, Clone, Deserialize)]
pub struct QueryTemplates {
    /// Reference user's mobile inbox row, selected by employee SID
    #[serde(rename = "qrymobileinbox")]
    pub mobile_inbox: String,
    /// Group selected by keyword; ends inside an open string literal
    #[serde(rename = "qrygroup")]
    pub group: String,
    /// Members of a group, selected by group ID
    #[serde(rename = "qrygroupempsids")]
    pub group_members: String,
    /// Employee identity, selected by employee SID
    #[serde(rename = "qryemployee")]
    pub employee: String,
}

impl QueryTemplates {
    /// Reject empty templates
    pub fn validate(&self) -> Result<(), AppError> {
        let named = [
            ("qrymobileinbox", &self.mobile_inbox),
            ("qrygroup", &self.group),
            ("qrygroupempsids", &self.group_members),
            ("qryemployee", &self.employee),
        ];
        for (key, template) in named {
            if template.trim().is_empty() {
                return Err(AppError::Config(format!("{} cannot be empty", key)));
            }
        }
        Ok(())
    }

    /// Query for the reference user's `DEFAULTVALUE`
    pub fn mobile_inbox_query(&self, employee_sid: i64) -> String {
        format!("{}{}", self.mobile_inbox, employee_sid)
    }

    /// Query for the `GROUPID` of the group with `keyword`
    pub fn group_query(&self, keyword: &str) -> String {
        format!("{}{}'", self.group, keyword.replace('\'', "''"))
    }

    /// Query for the `EMPLOYEESID`s in a group
    pub fn group_members_query(&self, group_id: i64) -> String {
        format!("{}{}", self.group_members, group_id)
    }

    /// Query for one employee's `UNIQUENAME`
    pub fn employee_query(&self, employee_sid: i64) -> String {
        format!("{}{}", self.employee, employee_sid)
    }
}
