//! Event model
//!
//! Besides the persisted row this module holds the status rules for events:
//! who may edit what, when an edit is staged as pending updates instead of
//! going live, and what approval and rejection do to a record.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::FromRow;
use crate::models::user::Caller;
use crate::utils::errors::{EventHubError, Result};
use crate::utils::helpers::{check_length, check_positive, check_price, non_blank, normalize_tags, parse_event_date, parse_positive_int, parse_price, require_text};

pub const DEFAULT_CATEGORY: &str = "General";

/// Column limits of the `events` table
pub const MAX_NAME_CHARS: usize = 255;
pub const MAX_TIME_CHARS: usize = 64;
pub const MAX_LOCATION_CHARS: usize = 255;
pub const MAX_CATEGORY_CHARS: usize = 100;

fn bounded_text(field: &str, value: Option<String>, max_chars: usize) -> Result<String> {
    check_length(field, require_text(field, value)?, max_chars)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Approved,
    Rejected,
}

impl EventStatus {
    /// Status a freshly created event starts in
    pub fn initial_for(creator: &Caller) -> Self {
        if creator.is_admin() {
            EventStatus::Approved
        } else {
            EventStatus::Pending
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Approved => "approved",
            EventStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventStatus {
    type Err = EventHubError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(EventStatus::Pending),
            "approved" => Ok(EventStatus::Approved),
            "rejected" => Ok(EventStatus::Rejected),
            other => Err(EventHubError::InvalidInput(format!("Unknown event status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub date: NaiveDate,
    pub time: String,
    pub location: String,
    pub capacity: i32,
    pub price: Decimal,
    pub category: String,
    pub agenda: Option<String>,
    pub tags: Vec<String>,
    pub image: Option<String>,
    pub created_by: i64,
    pub status: EventStatus,
    pub pending_updates: Option<Json<EventPatch>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Event together with its live count of active bookings
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub event: Event,
    pub bookings_count: i64,
}

/// The set of event fields an edit may touch. Every field is optional and
/// only present fields are ever written.
///
/// Also the shape stored in `pending_updates` while an owner's edit to an
/// approved event waits for review.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agenda: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        self.changed_fields().is_empty()
    }

    /// Names of the fields this patch sets
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() { fields.push("name"); }
        if self.description.is_some() { fields.push("description"); }
        if self.date.is_some() { fields.push("date"); }
        if self.time.is_some() { fields.push("time"); }
        if self.location.is_some() { fields.push("location"); }
        if self.capacity.is_some() { fields.push("capacity"); }
        if self.price.is_some() { fields.push("price"); }
        if self.category.is_some() { fields.push("category"); }
        if self.agenda.is_some() { fields.push("agenda"); }
        if self.tags.is_some() { fields.push("tags"); }
        if self.image.is_some() { fields.push("image"); }
        fields
    }

    /// Fold a newer patch into this one; fields set in `newer` win, the rest keep their staged value
    pub fn merge(&mut self, newer: EventPatch) {
        fn take<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        take(&mut self.name, newer.name);
        take(&mut self.description, newer.description);
        take(&mut self.date, newer.date);
        take(&mut self.time, newer.time);
        take(&mut self.location, newer.location);
        take(&mut self.capacity, newer.capacity);
        take(&mut self.price, newer.price);
        take(&mut self.category, newer.category);
        take(&mut self.agenda, newer.agenda);
        take(&mut self.tags, newer.tags);
        take(&mut self.image, newer.image);
    }

    /// Write the present fields onto a live event
    pub fn apply_to(&self, event: &mut Event) {
        if let Some(name) = &self.name { event.name = name.clone(); }
        if let Some(description) = &self.description { event.description = description.clone(); }
        if let Some(date) = self.date { event.date = date; }
        if let Some(time) = &self.time { event.time = time.clone(); }
        if let Some(location) = &self.location { event.location = location.clone(); }
        if let Some(capacity) = self.capacity { event.capacity = capacity; }
        if let Some(price) = self.price { event.price = price; }
        if let Some(category) = &self.category { event.category = category.clone(); }
        if let Some(agenda) = &self.agenda { event.agenda = non_blank(Some(agenda.clone())); }
        if let Some(tags) = &self.tags { event.tags = tags.clone(); }
        if let Some(image) = &self.image { event.image = non_blank(Some(image.clone())); }
    }
}

/// A number as it may arrive from a form or JSON body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl NumberInput {
    fn to_positive_int(&self, field: &str) -> Result<i32> {
        match self {
            NumberInput::Integer(v) => check_positive(field, *v),
            NumberInput::Float(v) if v.is_finite() && v.fract() == 0.0 => check_positive(field, *v as i64),
            NumberInput::Float(_) => Err(EventHubError::InvalidInput(format!("{} must be a whole number", field))),
            NumberInput::Text(v) => parse_positive_int(field, v),
        }
    }

    fn to_price(&self) -> Result<Decimal> {
        match self {
            NumberInput::Integer(v) => check_price(Decimal::from(*v)),
            NumberInput::Float(v) => Decimal::try_from(*v)
                .map_err(|_| EventHubError::InvalidInput("Price must be a number".to_string()))
                .and_then(check_price),
            NumberInput::Text(v) => parse_price(v),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub capacity: Option<NumberInput>,
    pub price: Option<NumberInput>,
    pub category: Option<String>,
    pub agenda: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub image: Option<String>,
}

/// Validated input for inserting an event
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub name: String,
    pub description: String,
    pub date: NaiveDate,
    pub time: String,
    pub location: String,
    pub capacity: i32,
    pub price: Decimal,
    pub category: String,
    pub agenda: Option<String>,
    pub tags: Vec<String>,
    pub image: Option<String>,
}

impl CreateEventRequest {
    /// Check required fields and parse numbers and dates
    pub fn validate(self) -> Result<NewEvent> {
        let missing: Vec<&str> = [
            ("name", self.name.as_deref()),
            ("description", self.description.as_deref()),
            ("date", self.date.as_deref()),
            ("time", self.time.as_deref()),
            ("location", self.location.as_deref()),
        ]
        .iter()
        .filter(|(_, v)| v.map_or(true, |s| s.trim().is_empty()))
        .map(|(field, _)| *field)
        .chain(self.capacity.is_none().then_some("capacity"))
        .collect();

        if !missing.is_empty() {
            return Err(EventHubError::InvalidInput(format!(
                "All required fields must be provided (missing: {})",
                missing.join(", ")
            )));
        }

        let date = parse_event_date(self.date.as_deref().unwrap_or_default())?;
        let capacity = self
            .capacity
            .as_ref()
            .map(|c| c.to_positive_int("Capacity"))
            .transpose()?
            .unwrap_or_default();
        let price = match &self.price {
            Some(price) => price.to_price()?,
            None => Decimal::ZERO,
        };

        Ok(NewEvent {
            name: bounded_text("Name", self.name, MAX_NAME_CHARS)?,
            description: require_text("Description", self.description)?,
            date,
            time: bounded_text("Time", self.time, MAX_TIME_CHARS)?,
            location: bounded_text("Location", self.location, MAX_LOCATION_CHARS)?,
            capacity,
            price,
            category: match non_blank(self.category) {
                Some(category) => check_length("Category", category, MAX_CATEGORY_CHARS)?,
                None => DEFAULT_CATEGORY.to_string(),
            },
            agenda: non_blank(self.agenda),
            tags: normalize_tags(self.tags),
            image: non_blank(self.image),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub capacity: Option<NumberInput>,
    pub price: Option<NumberInput>,
    pub category: Option<String>,
    pub agenda: Option<String>,
    pub tags: Option<Vec<String>>,
    pub image: Option<String>,
}

impl UpdateEventRequest {
    /// Validate the present fields into a patch; absent fields stay absent
    pub fn into_patch(self) -> Result<EventPatch> {
        let text = |field: &str, value: Option<String>, max_chars: usize| -> Result<Option<String>> {
            value.map(|v| bounded_text(field, Some(v), max_chars)).transpose()
        };

        Ok(EventPatch {
            name: text("Name", self.name, MAX_NAME_CHARS)?,
            description: self.description.map(|d| require_text("Description", Some(d))).transpose()?,
            date: self.date.as_deref().map(parse_event_date).transpose()?,
            time: text("Time", self.time, MAX_TIME_CHARS)?,
            location: text("Location", self.location, MAX_LOCATION_CHARS)?,
            capacity: self.capacity.as_ref().map(|c| c.to_positive_int("Capacity")).transpose()?,
            price: self.price.as_ref().map(NumberInput::to_price).transpose()?,
            category: text("Category", self.category, MAX_CATEGORY_CHARS)?,
            // blank clears the field once applied
            agenda: self.agenda.map(|a| a.trim().to_string()),
            tags: self.tags.map(normalize_tags),
            image: self.image.map(|i| i.trim().to_string()),
        })
    }
}

/// How an accepted edit is carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePlan {
    /// Write the fields onto the live event
    ApplyDirectly {
        /// Drop any staged pending updates
        clear_pending: bool,
        /// Move a rejected event back to pending review
        resubmit: bool,
    },
    /// Merge the fields into `pending_updates`, leaving the live event alone
    StageForReview,
}

/// What a rejection did to the event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionOutcome {
    /// Staged pending updates were thrown away; the live event stays approved
    PendingUpdatesDiscarded,
    /// The event itself was rejected and kept so its owner can resubmit
    EventRejected,
}

/// Decide how `caller` may edit `event`
pub fn plan_update(event: &Event, caller: &Caller) -> Result<UpdatePlan> {
    if caller.is_admin() {
        return Ok(UpdatePlan::ApplyDirectly { clear_pending: true, resubmit: false });
    }

    if event.created_by != caller.id {
        return Err(EventHubError::PermissionDenied(
            "Not authorized to update this event".to_string(),
        ));
    }

    Ok(match event.status {
        EventStatus::Approved => UpdatePlan::StageForReview,
        EventStatus::Pending => UpdatePlan::ApplyDirectly { clear_pending: false, resubmit: false },
        EventStatus::Rejected => UpdatePlan::ApplyDirectly { clear_pending: false, resubmit: true },
    })
}

impl Event {
    /// Staged updates awaiting review, if any
    pub fn pending(&self) -> Option<&EventPatch> {
        self.pending_updates.as_ref().map(|json| &json.0)
    }

    pub fn has_pending_updates(&self) -> bool {
        self.pending().is_some()
    }

    pub fn is_owned_by(&self, caller: &Caller) -> bool {
        self.created_by == caller.id
    }

    /// Carry out an edit according to a plan from [`plan_update`]
    pub fn apply_update(&mut self, patch: EventPatch, plan: UpdatePlan) {
        match plan {
            UpdatePlan::ApplyDirectly { clear_pending, resubmit } => {
                patch.apply_to(self);
                if clear_pending {
                    self.pending_updates = None;
                }
                if resubmit {
                    self.status = EventStatus::Pending;
                    self.rejection_reason = None;
                }
            }
            UpdatePlan::StageForReview => {
                let mut staged = self.pending().cloned().unwrap_or_default();
                staged.merge(patch);
                self.pending_updates = if staged.is_empty() { None } else { Some(Json(staged)) };
            }
        }
    }

    /// Promote staged updates (if any) into the live fields and mark the event approved
    pub fn approve(&mut self) {
        if let Some(Json(staged)) = self.pending_updates.take() {
            staged.apply_to(self);
        }
        self.status = EventStatus::Approved;
        self.rejection_reason = None;
    }

    /// Reject staged updates if there are any, otherwise the event itself
    pub fn reject(&mut self, reason: Option<String>) -> RejectionOutcome {
        let reason = non_blank(reason);
        if self.pending_updates.take().is_some() {
            self.rejection_reason = reason;
            RejectionOutcome::PendingUpdatesDiscarded
        } else {
            self.status = EventStatus::Rejected;
            self.rejection_reason = reason;
            RejectionOutcome::EventRejected
        }
    }
}

/// Which statuses a listing includes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Only(EventStatus),
    All,
}

impl Default for StatusFilter {
    fn default() -> Self {
        StatusFilter::Only(EventStatus::Approved)
    }
}

impl StatusFilter {
    /// Read a `status` query value; absent means approved only, `all` means every status
    pub fn parse(value: Option<&str>) -> Result<Self> {
        match value.map(str::trim) {
            None | Some("") => Ok(StatusFilter::default()),
            Some(v) if v.eq_ignore_ascii_case("all") => Ok(StatusFilter::All),
            Some(v) => v.parse().map(StatusFilter::Only),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub status: StatusFilter,
    pub search: Option<String>,
    pub created_by: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
