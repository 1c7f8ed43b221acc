//! Entitlement engine.
//!
//! Pure rules for the subscription lifecycle: plan assignment and expiry
//! derivation, revocation, partial updates and the computed `is_active` predicate.
//! Nothing here touches the database or the wall clock; callers pass `today`.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::error::ValidationError;

pub const PLAN_REQUIRED: &str = "Plan is required unless subscription is revoked.";

/// Plan
///
/// Entitlement tier. Each tier grants a fixed number of days from the start date.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, TS, ToSchema,
)]
#[sqlx(type_name = "subscription_plan", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Plan {
    Monthly,
    Yearly,
}

impl Plan {
    pub fn duration_days(self) -> u64 {
        match self {
            Plan::Monthly => 30,
            Plan::Yearly => 365,
        }
    }

    /// Last valid day for a plan started on `start`.
    pub fn expiry_from(self, start: NaiveDate) -> NaiveDate {
        start
            .checked_add_days(Days::new(self.duration_days()))
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Plan::Monthly => "monthly",
            Plan::Yearly => "yearly",
        }
    }

    /// Parses an optional raw plan value. Blank counts as absent.
    pub fn parse_optional(raw: Option<&str>) -> Result<Option<Plan>, ValidationError> {
        match raw {
            None | Some("") => Ok(None),
            Some(value) => value.parse().map(Some),
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(Plan::Monthly),
            "yearly" => Ok(Plan::Yearly),
            other => Err(ValidationError::field(
                "plan",
                format!("\"{}\" is not a valid choice.", other),
            )),
        }
    }
}

/// EntitlementChange
///
/// The writable subset of a subscription as supplied by a caller. `plan` stays a raw
/// string so unknown values surface as a field error instead of a body rejection.
/// `start_date` is only read by `Entitlement::create`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitlementChange {
    pub plan: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub revoked: Option<bool>,
}

impl EntitlementChange {
    pub fn plan(plan: Plan) -> Self {
        Self {
            plan: Some(plan.as_str().to_string()),
            ..Self::default()
        }
    }

    pub fn revoke() -> Self {
        Self {
            revoked: Some(true),
            ..Self::default()
        }
    }
}

/// Entitlement
///
/// The persisted lifecycle fields of a subscription.
///
/// Invariants maintained by every operation below:
/// - `revoked` implies `plan`, `start_date` and `end_date` are all `None`.
/// - with a plan and no revocation, `end_date == plan.expiry_from(start_date)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow)]
pub struct Entitlement {
    pub plan: Option<Plan>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub revoked: bool,
}

impl Entitlement {
    /// A fresh grant starting on `start_date`.
    pub fn granted(plan: Plan, start_date: NaiveDate) -> Self {
        Self {
            plan: Some(plan),
            start_date: Some(start_date),
            end_date: Some(plan.expiry_from(start_date)),
            revoked: false,
        }
    }

    pub fn revoked() -> Self {
        Self {
            revoked: true,
            ..Self::default()
        }
    }

    /// Sets the plan and re-derives `end_date`. An existing `start_date` is kept; a
    /// missing one becomes `today`. Clears any revocation.
    pub fn assign_plan(&mut self, plan: Plan, today: NaiveDate) {
        let start = *self.start_date.get_or_insert(today);
        self.plan = Some(plan);
        self.end_date = Some(plan.expiry_from(start));
        self.revoked = false;
    }

    /// Destructive reset: the next `assign_plan` starts a new period.
    pub fn revoke(&mut self) {
        *self = Self::revoked();
    }

    /// `end_date == today` still counts as active.
    pub fn is_active(&self, today: NaiveDate) -> bool {
        match (self.plan, self.end_date) {
            (Some(_), Some(end_date)) => !self.revoked && end_date >= today,
            _ => false,
        }
    }

    /// Initial state for a new subscription.
    pub fn create(change: &EntitlementChange, today: NaiveDate) -> Result<Self, ValidationError> {
        if change.revoked == Some(true) {
            return Ok(Self::revoked());
        }

        let plan = Plan::parse_optional(change.plan.as_deref())?
            .ok_or_else(|| ValidationError::field("plan", PLAN_REQUIRED))?;

        Ok(Self::granted(plan, change.start_date.unwrap_or(today)))
    }

    /// Partial update of an existing subscription. Revocation wins over anything else
    /// supplied alongside it. `change.start_date` is ignored: the start of a period is
    /// fixed once granted and only a revocation resets it.
    pub fn update(
        &mut self,
        change: &EntitlementChange,
        today: NaiveDate,
    ) -> Result<(), ValidationError> {
        if change.revoked == Some(true) {
            self.revoke();
            return Ok(());
        }

        match Plan::parse_optional(change.plan.as_deref())? {
            Some(plan) => self.assign_plan(plan, today),
            None => {
                if change.revoked == Some(false) {
                    self.revoked = false;
                }
            }
        }

        Ok(())
    }
}
