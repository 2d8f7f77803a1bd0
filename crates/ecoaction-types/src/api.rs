use serde::{Deserialize, Serialize, Serializer};

use crate::models::{
    CommunityAction, CommunityStats, ContactCategory, ContactMessage, IssueReport, MessageStatus,
    Pagination, Profile, RecentReport, ReportComment, ReportPriority, ReportStats, ReportStatus,
    SessionUser, Severity, User, UserId,
};

// -- Envelope --

/// Status fields the backend attaches to every JSON response, whatever the
/// payload. Decoded separately from the payload so that a failure body never
/// has to match the success shape.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

impl Envelope {
    /// Whether the body itself reports a failure, independent of HTTP status.
    pub fn is_failure(&self) -> bool {
        self.success == Some(false)
    }

    /// Best-effort human readable message. Validation details are appended
    /// when the backend sent them.
    pub fn error_message(&self) -> Option<String> {
        let error = self.error.clone()?;
        match &self.details {
            Some(details) if !details.is_null() => Some(format!("{}: {}", error, details)),
            _ => Some(error),
        }
    }
}

/// Payload carried under `data` by the emergency endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Data<T> {
    pub data: T,
}

/// Plain acknowledgement (`{"success": true, "message": "..."}`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: Option<String>,
}

// -- Auth --

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub full_name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ForgotPasswordRequest<'a> {
    pub email: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ResetPasswordRequest<'a> {
    pub token: &'a str,
    pub password: &'a str,
}

/// Body returned by `/auth/login` and `/auth/register`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
    #[serde(default)]
    pub profile: Option<Profile>,
}

impl AuthResponse {
    pub fn into_parts(self) -> (String, SessionUser) {
        (self.token, SessionUser::new(self.user, self.profile))
    }
}

/// Body returned by `/auth/me`.
#[derive(Debug, Clone, Deserialize)]
pub struct MeResponse {
    pub user: User,
    #[serde(default)]
    pub profile: Option<Profile>,
}

impl From<MeResponse> for SessionUser {
    fn from(me: MeResponse) -> Self {
        SessionUser::new(me.user, me.profile)
    }
}

// -- Community --

/// Query filters for listing actions. The pseudo-category `All categories`
/// (what the category picker shows by default) means no category filter.
#[derive(Debug, Clone, Default)]
pub struct ActionFilters {
    pub category: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

pub const ALL_CATEGORIES: &str = "All categories";

impl ActionFilters {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(category) = self.category.as_deref() {
            if !category.is_empty() && category != ALL_CATEGORIES {
                query.push(("category", category.to_string()));
            }
        }
        if let Some(status) = self.status.as_deref().filter(|s| !s.is_empty()) {
            query.push(("status", status.to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            query.push(("search", search.to_string()));
        }
        query
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAction {
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    /// ISO-8601 local timestamp, e.g. `2025-10-18T09:00:00`.
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact_metric: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ActionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact_metric: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionList {
    pub actions: Vec<CommunityAction>,
    #[serde(default)]
    pub count: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionResponse {
    pub action: CommunityAction,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsResponse {
    pub stats: CommunityStats,
}

// -- Emergency --

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewEmergencyReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter_email: Option<String>,
    pub emergency_type: String,
    pub location: String,
    pub description: String,
    pub severity: Severity,
}

// -- Contact --

#[derive(Debug, Clone, Serialize)]
pub struct NewContactMessage {
    pub email: String,
    pub category: ContactCategory,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct MessageFilters {
    pub status: Option<MessageStatus>,
    pub category: Option<ContactCategory>,
}

#[derive(Debug, Serialize)]
pub struct UpdateMessageStatus {
    pub status: MessageStatus,
}

/// Returned by submit and status-update calls.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactMessageResponse {
    pub contact_message: ContactMessage,
}

/// Returned by the single-message lookup, which reuses the `message` key.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactMessageDetail {
    pub message: ContactMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactMessageList {
    pub messages: Vec<ContactMessage>,
    #[serde(default)]
    pub count: Option<usize>,
}

// -- Issue reports --

fn lowercase_severity<S: Serializer>(severity: &Severity, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(severity.as_str())
}

fn lowercase_severity_opt<S: Serializer>(
    severity: &Option<Severity>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match severity {
        Some(severity) => lowercase_severity(severity, serializer),
        None => serializer.serialize_none(),
    }
}

/// Body of `POST /reports/`. `user_id` is filled in from the session by the
/// facade.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewIssueReport {
    pub user_id: UserId,
    pub title: String,
    pub description: String,
    pub issue_type: String,
    pub location: String,
    pub county: String,
    #[serde(serialize_with = "lowercase_severity")]
    pub severity: Severity,
    pub priority: ReportPriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IssueReportUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ReportStatus>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "lowercase_severity_opt"
    )]
    pub severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<ReportPriority>,
}

impl IssueReportUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.severity.is_none() && self.priority.is_none()
    }
}

#[derive(Debug, Serialize)]
pub struct NewReportComment<'a> {
    pub user_id: UserId,
    pub content: &'a str,
    pub is_ai_generated: bool,
}

/// Paging and status filter for a user's reports.
#[derive(Debug, Clone, Default)]
pub struct ReportQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<ReportStatus>,
}

impl ReportQuery {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(page) = self.page {
            query.push(("page", page.to_string()));
        }
        if let Some(per_page) = self.per_page {
            query.push(("per_page", per_page.to_string()));
        }
        if let Some(status) = self.status {
            query.push(("status", status.as_str().to_string()));
        }
        query
    }
}

/// Analysis the backend attaches when a report is created.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReportAnalysis {
    #[serde(default)]
    pub analysis: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub suggested_actions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedReport {
    pub report: IssueReport,
    #[serde(default)]
    pub ai_analysis: Option<ReportAnalysis>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportResponse {
    pub report: IssueReport,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportPage {
    pub reports: Vec<IssueReport>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecentReports {
    pub recent_reports: Vec<RecentReport>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportStatsResponse {
    pub stats: ReportStats,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentResponse {
    pub comment: ReportComment,
}

// -- Profile --

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Partial counter update; absent fields are left alone by the backend.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues_reported: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alerts_responded: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community_impact: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trees_planted: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact_points: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues_this_month: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alerts_this_month: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact_this_month: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trees_this_month: Option<u32>,
}

// -- Upload --

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadedImage {
    pub image_url: String,
    pub filename: String,
}

// -- AI --

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}
