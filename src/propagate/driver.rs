//! Propagation driver
//!
//! Runs the lookup chain (reference user → group → members → identity) and
//! sends one update per member. Lookups and authentication are fatal on
//! failure; a failed update only marks that member as failed.

use crate::api::types::{response_status, STATUS_OK};
use crate::api::{MobileSearchApi, SessionToken};
use crate::config::{Config, Credentials};
use crate::db::{DisplayOptions, QueryExecutor, QueryTemplates, Table};
use crate::error::AppError;
use crate::propagate::payload::PayloadTemplate;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

const DEFAULT_VALUE_COLUMN: &str = "DEFAULTVALUE";
const GROUP_ID_COLUMN: &str = "GROUPID";
const EMPLOYEE_SID_COLUMN: &str = "EMPLOYEESID";
const UNIQUE_NAME_COLUMN: &str = "UNIQUENAME";

/// Where a run currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No token yet
    Unauthenticated,
    /// Token obtained
    Authenticated,
    /// Reference user's default search read
    ReferenceLookupDone,
    /// Group ID resolved from the keyword
    GroupResolved,
    /// Member list read
    MembersResolved,
    /// Sending updates
    Iterating,
    /// Every member processed
    Done,
    /// Stopped by a fatal error
    Aborted,
}

impl RunState {
    /// Name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Unauthenticated => "unauthenticated",
            RunState::Authenticated => "authenticated",
            RunState::ReferenceLookupDone => "reference_lookup_done",
            RunState::GroupResolved => "group_resolved",
            RunState::MembersResolved => "members_resolved",
            RunState::Iterating => "iterating",
            RunState::Done => "done",
            RunState::Aborted => "aborted",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator input of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropagationRequest {
    /// Employee SID of the user whose mobile inbox is copied
    pub reference_employee_sid: i64,
    /// Keyword of the group whose members receive it
    pub group_keyword: String,
}

/// Result of one member's update call
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateStatus {
    /// The endpoint accepted the update; its response
    Updated(Value),
    /// The call failed or the endpoint reported an error
    Failed(String),
}

/// One member's outcome
#[derive(Debug, Clone, PartialEq)]
pub struct MemberOutcome {
    /// Member's employee SID
    pub employee_sid: i64,
    /// Member's login name
    pub unique_name: String,
    /// What happened to the update
    pub status: UpdateStatus,
}

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Correlates the run's log lines
    pub run_id: Uuid,
    /// When the lookups started
    pub started_at: DateTime<Utc>,
    /// When the last member was processed
    pub finished_at: DateTime<Utc>,
    /// The pushed `DefaultValue`
    pub default_value: Value,
    /// Resolved group
    pub group_id: i64,
    /// One entry per member, in query order
    pub outcomes: Vec<MemberOutcome>,
}

impl RunReport {
    /// Members whose update was accepted
    pub fn updated_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, UpdateStatus::Updated(_)))
            .count()
    }

    /// Members whose update failed
    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.updated_count()
    }
}

/// Drives a propagation run against an API and a query executor
pub struct Propagator<A> {
    api: A,
    credentials: Credentials,
    queries: QueryTemplates,
    template: PayloadTemplate,
    display: DisplayOptions,
    state: RunState,
}

impl<A: MobileSearchApi> Propagator<A> {
    /// Create a driver
    pub fn new(
        api: A,
        credentials: Credentials,
        queries: QueryTemplates,
        template: PayloadTemplate,
    ) -> Self {
        Self {
            api,
            credentials,
            queries,
            template,
            display: DisplayOptions::default(),
            state: RunState::Unauthenticated,
        }
    }

    /// Create a driver from the loaded configuration
    pub fn from_config(api: A, config: &Config) -> Self {
        Self::new(
            api,
            config.credentials.clone(),
            config.queries.clone(),
            PayloadTemplate::new(config.payload.clone()),
        )
        .with_display(config.display.clone())
    }

    /// Set the table rendering limits for debug logs
    pub fn with_display(mut self, display: DisplayOptions) -> Self {
        self.display = display;
        self
    }

    /// Current state
    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = %self.state, to = %next, "State transition");
        self.state = next;
    }

    /// Obtain a session token
    ///
    /// # Errors
    /// * `AppError::Authentication` if the API handed out an empty token
    pub async fn authenticate(&mut self) -> Result<SessionToken, AppError> {
        let token = self.api.authenticate(&self.credentials).await;
        if token.is_empty() {
            self.transition(RunState::Aborted);
            return Err(AppError::Authentication {
                username: self.credentials.username.clone(),
            });
        }
        self.transition(RunState::Authenticated);
        Ok(token)
    }

    /// Push the reference user's default search to every group member
    ///
    /// The executor is not closed; see [`Propagator::run`] for the variant
    /// that owns it.
    ///
    /// # Errors
    /// Any fatal error moves the driver to `Aborted` and is returned after
    /// being logged.
    pub async fn propagate<E: QueryExecutor>(
        &mut self,
        executor: &mut E,
        token: &SessionToken,
        request: &PropagationRequest,
    ) -> Result<RunReport, AppError> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "propagation",
            run_id = %run_id,
            reference = request.reference_employee_sid,
            group = %request.group_keyword,
        );

        let result = self
            .propagate_inner(executor, token, request, run_id)
            .instrument(span.clone())
            .await;

        if let Err(e) = &result {
            let failed_in = self.state;
            self.transition(RunState::Aborted);
            span.in_scope(|| {
                error!(
                    state = %failed_in,
                    error = %e,
                    detail = ?e,
                    "Propagation aborted"
                );
            });
        }
        result
    }

    /// Authenticate, propagate, and close the executor whatever the outcome
    ///
    /// For unattended runs. The interactive binary calls
    /// [`Propagator::authenticate`] and [`Propagator::propagate`] itself so it
    /// can confirm the account and ask for the request in between, and only
    /// connects to the database after that.
    pub async fn run<E: QueryExecutor>(
        &mut self,
        mut executor: E,
        request: &PropagationRequest,
    ) -> Result<RunReport, AppError> {
        let result = match self.authenticate().await {
            Ok(token) => self.propagate(&mut executor, &token, request).await,
            Err(e) => Err(e),
        };
        executor.close().await;
        result
    }

    async fn propagate_inner<E: QueryExecutor>(
        &mut self,
        executor: &mut E,
        token: &SessionToken,
        request: &PropagationRequest,
        run_id: Uuid,
    ) -> Result<RunReport, AppError> {
        if token.is_empty() {
            return Err(AppError::Authentication {
                username: self.credentials.username.clone(),
            });
        }
        self.transition(RunState::Authenticated);
        let started_at = Utc::now();

        let sql = self
            .queries
            .mobile_inbox_query(request.reference_employee_sid);
        let inbox = self.lookup(executor, "mobile inbox", &sql).await?;
        let default_value = inbox.first("mobile inbox", DEFAULT_VALUE_COLUMN)?.to_json();
        info!(
            "Mobile Inbox will be updated to use {}",
            display_value(&default_value)
        );
        let mut payload = self.template.with_default_value(default_value.clone());
        debug!(payload = %payload, "Payload prepared");
        self.transition(RunState::ReferenceLookupDone);

        let sql = self.queries.group_query(&request.group_keyword);
        let group = self.lookup(executor, "group", &sql).await?;
        let group_id = group
            .first("group", GROUP_ID_COLUMN)?
            .expect_i64(GROUP_ID_COLUMN)?;
        self.transition(RunState::GroupResolved);

        let sql = self.queries.group_members_query(group_id);
        let members = self.lookup(executor, "group members", &sql).await?;
        let employee_sids = members
            .column("group members", EMPLOYEE_SID_COLUMN)?
            .into_iter()
            .map(|cell| cell.expect_i64(EMPLOYEE_SID_COLUMN))
            .collect::<Result<Vec<_>, _>>()?;
        self.transition(RunState::MembersResolved);

        if employee_sids.is_empty() {
            warn!(group_id = group_id, "Group has no members; nothing to update");
        }

        self.transition(RunState::Iterating);
        let mut outcomes = Vec::with_capacity(employee_sids.len());
        for employee_sid in employee_sids {
            let sql = self.queries.employee_query(employee_sid);
            let employee = self.lookup(executor, "employee", &sql).await?;
            let unique_name = employee.first("employee", UNIQUE_NAME_COLUMN)?.to_string();

            let body = payload.for_employee(employee_sid);
            let sending = Value::Object(body.clone());
            debug!(payload = %sending, "Sending update");
            info!("Updating Mobile Inbox for {}", unique_name);

            let status = match self.api.update_mobile_search(token, body).await {
                Ok(response) => {
                    debug!("JSON response: {}", response);
                    classify_response(response)
                }
                Err(e) => UpdateStatus::Failed(e.to_string()),
            };
            if let UpdateStatus::Failed(reason) = &status {
                warn!(
                    employee_sid = employee_sid,
                    unique_name = %unique_name,
                    reason = %reason,
                    "Mobile Inbox update failed"
                );
            }

            outcomes.push(MemberOutcome {
                employee_sid,
                unique_name,
                status,
            });
        }

        self.transition(RunState::Done);
        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            default_value,
            group_id,
            outcomes,
        };
        info!(
            updated = report.updated_count(),
            failed = report.failed_count(),
            "Update Mobile Inbox Searches Finished"
        );
        Ok(report)
    }

    async fn lookup<E: QueryExecutor>(
        &self,
        executor: &mut E,
        lookup: &'static str,
        sql: &str,
    ) -> Result<Table, AppError> {
        let table = executor.fetch_table(sql).await?;
        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!("{} lookup:\n{}", lookup, table.render(&self.display));
        }
        Ok(table)
    }
}

/// An error-shaped response (non-zero `Status`) counts as a failure
fn classify_response(response: Value) -> UpdateStatus {
    match response_status(&response) {
        Some(status) if status != STATUS_OK => {
            let message = response
                .get("Message")
                .and_then(Value::as_str)
                .unwrap_or("no message");
            UpdateStatus::Failed(format!("API returned status {}: {}", status, message))
        }
        _ => UpdateStatus::Updated(response),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
