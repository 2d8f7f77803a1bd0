use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::timestamp;

pub type UserId = i64;

/// Identifier of a community action as assigned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(pub i64);

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// -- Users --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<NaiveDateTime>,
}

/// Profile record owned by the backend. Counters default to zero because
/// freshly registered profiles are returned with only `id`, `user_id` and
/// `full_name` populated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub county: Option<String>,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub member_since: Option<NaiveDate>,
    #[serde(default)]
    pub issues_reported: u32,
    #[serde(default)]
    pub alerts_responded: u32,
    #[serde(default)]
    pub community_impact: u32,
    #[serde(default)]
    pub trees_planted: u32,
    #[serde(default)]
    pub impact_points: u32,
    #[serde(default)]
    pub issues_this_month: u32,
    #[serde(default)]
    pub alerts_this_month: u32,
    #[serde(default)]
    pub impact_this_month: u32,
    #[serde(default)]
    pub trees_this_month: u32,
}

impl Profile {
    /// "Area, County" when both are known, otherwise whichever one is set.
    pub fn formatted_location(&self) -> String {
        match (self.area.as_deref(), self.county.as_deref()) {
            (Some(area), Some(county)) => format!("{}, {}", area, county),
            (Some(one), None) | (None, Some(one)) => one.to_string(),
            (None, None) => String::new(),
        }
    }
}

/// The signed-in user as the rest of the client sees it: identity merged
/// with the optional profile.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUser {
    pub user: User,
    pub profile: Option<Profile>,
}

impl SessionUser {
    pub fn new(user: User, profile: Option<Profile>) -> Self {
        Self { user, profile }
    }

    pub fn id(&self) -> UserId {
        self.user.id
    }

    pub fn email(&self) -> &str {
        &self.user.email
    }

    pub fn full_name(&self) -> Option<&str> {
        self.profile.as_ref().and_then(|p| p.full_name.as_deref())
    }

    /// Name to greet the user with; falls back to the email address.
    pub fn display_name(&self) -> &str {
        self.full_name().unwrap_or(&self.user.email)
    }
}

// -- Community --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionCategory {
    Environment,
    Agriculture,
    Conservation,
    Education,
}

impl ActionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Environment => "Environment",
            Self::Agriculture => "Agriculture",
            Self::Conservation => "Conservation",
            Self::Education => "Education",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Pending,
    Active,
    Completed,
    Rejected,
    Cancelled,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityAction {
    pub id: ActionId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    #[serde(with = "timestamp")]
    pub date: NaiveDateTime,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub participants_count: u32,
    #[serde(default)]
    pub impact_metric: Option<String>,
    #[serde(default = "default_action_status")]
    pub status: ActionStatus,
    #[serde(default)]
    pub created_by: Option<UserId>,
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<NaiveDateTime>,
}

fn default_action_status() -> ActionStatus {
    ActionStatus::Pending
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunityStats {
    pub active_actions: u32,
    pub total_participants: u64,
}

// -- Emergency --

/// Emergency endpoints spell severities `High`, issue reports `high`; both
/// are accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    #[serde(alias = "low")]
    Low,
    #[default]
    #[serde(alias = "medium")]
    Medium,
    #[serde(alias = "high")]
    High,
    #[serde(alias = "critical")]
    Critical,
}

impl Severity {
    pub fn is_priority(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }

    /// Lowercase spelling used by the issue report endpoints.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyAlert {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub location: String,
    pub severity: Severity,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub recommendation: Option<String>,
    #[serde(default)]
    pub affected_areas: Option<String>,
    #[serde(default)]
    pub county: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<NaiveDateTime>,
    #[serde(default, with = "timestamp::option")]
    pub expires_at: Option<NaiveDateTime>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyReport {
    pub id: i64,
    #[serde(default)]
    pub reporter_name: Option<String>,
    #[serde(default)]
    pub reporter_phone: Option<String>,
    #[serde(default)]
    pub reporter_email: Option<String>,
    pub emergency_type: String,
    pub location: String,
    pub description: String,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub id: i64,
    pub service: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub number: String,
    #[serde(default)]
    pub county: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Dashboard summary computed by the backend from the active alerts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyInsights {
    pub title: String,
    pub description: String,
    pub recommendation: String,
    pub alert_trend: String,
    pub affected_areas: String,
    pub county: String,
    pub ai_status: String,
    pub active_alerts: u32,
}

// -- Contact --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContactCategory {
    General,
    Technical,
    Feedback,
    Partnership,
}

impl ContactCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "General",
            Self::Technical => "Technical",
            Self::Feedback => "Feedback",
            Self::Partnership => "Partnership",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    InProgress,
    Resolved,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub id: i64,
    pub email: String,
    pub category: ContactCategory,
    pub subject: String,
    pub message: String,
    #[serde(default = "default_message_status")]
    pub status: MessageStatus,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<NaiveDateTime>,
}

fn default_message_status() -> MessageStatus {
    MessageStatus::Pending
}

// -- Issue reports --

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    #[default]
    Pending,
    UnderReview,
    InProgress,
    Resolved,
    Rejected,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::UnderReview => "under_review",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Rejected => "rejected",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending Review",
            Self::UnderReview => "Under Review",
            Self::InProgress => "In Progress",
            Self::Resolved => "Resolved",
            Self::Rejected => "Rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// An environmental issue reported by a user, with the backend's
/// generated analysis attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueReport {
    pub id: i64,
    pub user_id: UserId,
    pub title: String,
    pub description: String,
    pub issue_type: String,
    pub location: String,
    pub county: String,
    #[serde(default)]
    pub status: ReportStatus,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub priority: ReportPriority,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub ai_analysis: Option<String>,
    #[serde(default)]
    pub ai_confidence: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub suggested_actions: Vec<String>,
    #[serde(default)]
    pub time_ago: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comments: Vec<ReportComment>,
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<NaiveDateTime>,
    #[serde(default, with = "timestamp::option")]
    pub resolved_at: Option<NaiveDateTime>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportComment {
    pub id: i64,
    pub content: String,
    #[serde(default)]
    pub is_ai_generated: bool,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<NaiveDateTime>,
}

/// Row of the "recent reports" widget for a county.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentReport {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub location: String,
    pub time_ago: String,
    #[serde(default)]
    pub status: ReportStatus,
    #[serde(default)]
    pub severity: Severity,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportStats {
    pub total_reports: u32,
    pub monthly_reports: u32,
    #[serde(default)]
    pub by_status: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total: u32,
    pub pages: u32,
}

// -- Dashboard --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub user: DashboardUser,
    #[serde(default)]
    pub ai_insights: Vec<DashboardInsight>,
    #[serde(default)]
    pub recent_activities: Vec<RecentActivity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardUser {
    pub name: String,
    pub stats: DashboardStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub issues_reported: u32,
    pub actions_joined: u32,
    pub community_impact: u32,
    pub trees_planted: u32,
    #[serde(default)]
    pub monthly_issues_increase: u32,
    #[serde(default)]
    pub monthly_actions_increase: u32,
}

/// Location-based insight card. `icon` and `color` are presentation hints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardInsight {
    #[serde(default)]
    pub id: Option<i64>,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub button_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentActivity {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Relative time as the backend renders it, e.g. `3h ago`.
    pub time: String,
}
