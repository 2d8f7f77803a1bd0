use tracing::{debug, info};

use ecoaction_types::api::{
    CommentResponse, CreatedReport, IssueReportUpdate, NewIssueReport, NewReportComment,
    RecentReports, ReportPage, ReportQuery, ReportResponse, ReportStatsResponse,
};
use ecoaction_types::models::{IssueReport, RecentReport, ReportComment, ReportStats, UserId};

use crate::error::{ClientError, Result};
use crate::http::ApiClient;
use crate::session::Credential;

/// `/reports/*` endpoints: environmental issues raised by users.
#[derive(Clone)]
pub struct IssueService {
    api: ApiClient,
}

impl IssueService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// File a report. The response carries the backend's analysis and
    /// suggested actions.
    pub async fn create(&self, report: &NewIssueReport, credential: Option<&Credential>) -> Result<CreatedReport> {
        validate_issue(report)?;
        let created: CreatedReport = self.api.post_json("/reports/", report, credential).await?;
        info!(
            report_id = created.report.id,
            issue_type = %created.report.issue_type,
            "issue reported"
        );
        Ok(created)
    }

    /// One report including its comments.
    pub async fn get(&self, id: i64) -> Result<IssueReport> {
        let resp: ReportResponse = self.api.get(&format!("/reports/{}", id), None).await?;
        Ok(resp.report)
    }

    /// A user's reports, newest first.
    pub async fn for_user(&self, user_id: UserId, query: &ReportQuery, credential: Option<&Credential>) -> Result<ReportPage> {
        self.api
            .get_with_query(&format!("/reports/user/{}", user_id), &query.to_query(), credential)
            .await
    }

    /// Reports from the last seven days in `county`.
    pub async fn recent(&self, county: &str, limit: Option<u32>) -> Result<Vec<RecentReport>> {
        let county = county.trim();
        if county.is_empty() || county.contains('/') {
            return Err(ClientError::Validation("Invalid county".into()));
        }
        let query: Vec<(&str, String)> = limit.map(|l| vec![("limit", l.to_string())]).unwrap_or_default();
        let resp: RecentReports = self
            .api
            .get_with_query(&format!("/reports/recent/{}", county), &query, None)
            .await?;
        Ok(resp.recent_reports)
    }

    pub async fn update(&self, id: i64, update: &IssueReportUpdate, credential: Option<&Credential>) -> Result<IssueReport> {
        if update.is_empty() {
            return Err(ClientError::Validation("No data provided".into()));
        }
        debug!(report_id = id, "updating report");
        let resp: ReportResponse = self
            .api
            .put_json(&format!("/reports/{}", id), update, credential)
            .await?;
        Ok(resp.report)
    }

    pub async fn add_comment(
        &self,
        id: i64,
        user_id: UserId,
        content: &str,
        credential: Option<&Credential>,
    ) -> Result<ReportComment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ClientError::Validation("Comment cannot be empty".into()));
        }
        let body = NewReportComment {
            user_id,
            content,
            is_ai_generated: false,
        };
        let resp: CommentResponse = self
            .api
            .post_json(&format!("/reports/{}/comments", id), &body, credential)
            .await?;
        Ok(resp.comment)
    }

    pub async fn stats(&self, user_id: UserId, credential: Option<&Credential>) -> Result<ReportStats> {
        let resp: ReportStatsResponse = self
            .api
            .get(&format!("/reports/stats/{}", user_id), credential)
            .await?;
        Ok(resp.stats)
    }
}

/// Required fields must be present; the title fits the backend column.
pub fn validate_issue(report: &NewIssueReport) -> Result<()> {
    let required = [
        ("title", &report.title),
        ("description", &report.description),
        ("issue_type", &report.issue_type),
        ("location", &report.location),
        ("county", &report.county),
    ];
    if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(ClientError::Validation(format!("Missing required field: {}", field)));
    }
    if report.title.trim().chars().count() > 200 {
        return Err(ClientError::Validation("Title must be at most 200 characters".into()));
    }
    if report.location.trim().chars().count() > 200 {
        return Err(ClientError::Validation("Location must be at most 200 characters".into()));
    }
    Ok(())
}
