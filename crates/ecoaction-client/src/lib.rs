//! Client core for the EcoAction platform: session handling, the community
//! action board with optimistic join/leave, image uploads and typed access to
//! the emergency, issue report, dashboard, contact, profile and assistant
//! endpoints.

pub mod ai;
pub mod auth;
pub mod board;
pub mod community;
pub mod config;
pub mod contact;
pub mod context;
pub mod coordinator;
pub mod dashboard;
pub mod emergency;
pub mod error;
pub mod events;
pub mod http;
pub mod issues;
pub mod profile;
pub mod report;
pub mod session;
pub mod telemetry;
pub mod upload;

use std::sync::Arc;

use tracing::warn;

use ecoaction_types::api::{
    CreatedReport, NewIssueReport, ProfileUpdate, ReportPage, ReportQuery, StatsUpdate, UploadedImage,
};
use ecoaction_types::models::{Dashboard, Profile, ReportComment, ReportStats, UserId};

pub use config::ClientConfig;
pub use context::{AuthContext, AuthState};
pub use coordinator::{CommunityCoordinator, MutationOutcome};
pub use error::{ClientError, Result, UploadRejected};
pub use session::{Credential, FileTokenStore, MemoryTokenStore, TokenStore};

use crate::ai::{AiService, Conversation};
use crate::auth::AuthService;
use crate::community::CommunityService;
use crate::contact::ContactService;
use crate::dashboard::DashboardService;
use crate::emergency::EmergencyService;
use crate::events::EventHub;
use crate::http::ApiClient;
use crate::issues::IssueService;
use crate::profile::ProfileService;
use crate::upload::{ImageFile, ProgressCallback, UploadProgress, UploadService};

/// Everything a front end needs, wired to one API base and one session.
#[derive(Clone)]
pub struct EcoActionClient {
    pub context: AuthContext,
    pub community: CommunityCoordinator,
    pub emergency: EmergencyService,
    pub issues: IssueService,
    pub contact: ContactService,
    pub ai: AiService,
    profile: ProfileService,
    upload: UploadService,
    dashboard: DashboardService,
}

impl EcoActionClient {
    /// Build a client whose session is kept in `config.token_path`.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let store = Arc::new(FileTokenStore::new(config.token_path.clone()));
        Self::with_store(config, store)
    }

    pub fn with_store(config: &ClientConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
        let api = ApiClient::new(config)?;
        let events = EventHub::new();
        let context = AuthContext::new(AuthService::new(api.clone()), store, events);
        let community = CommunityCoordinator::new(CommunityService::new(api.clone()), context.clone());

        Ok(Self {
            context,
            community,
            emergency: EmergencyService::new(api.clone()),
            issues: IssueService::new(api.clone()),
            contact: ContactService::new(api.clone()),
            ai: AiService::new(api.clone()),
            profile: ProfileService::new(api.clone()),
            dashboard: DashboardService::new(api.clone()),
            upload: UploadService::new(api),
        })
    }

    pub fn conversation(&self) -> Conversation {
        Conversation::new(self.ai.clone())
    }

    /// Upload with the current session's credential.
    pub async fn upload_image(
        &self,
        file: &ImageFile,
        progress: Arc<UploadProgress>,
        on_progress: Option<ProgressCallback>,
    ) -> Result<UploadedImage> {
        upload::precheck(file, &progress)?;
        let credential = self.context.require_credential()?;
        self.upload
            .upload_image(&credential, file, progress, on_progress)
            .await
    }

    pub async fn delete_image(&self, filename: &str) -> Result<()> {
        let credential = self.context.require_credential()?;
        self.upload.delete_image(&credential, filename).await?;
        Ok(())
    }

    /// The signed-in user's profile.
    pub async fn my_profile(&self) -> Result<Profile> {
        let (credential, user_id) = self.signed_in()?;
        self.profile.fetch(&credential, user_id).await
    }

    /// Update the signed-in user's profile and re-read the session user so
    /// the new name shows up everywhere.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile> {
        let (credential, user_id) = self.signed_in()?;
        let profile = self.profile.update(&credential, user_id, update).await?;
        self.context.refresh_user().await?;
        Ok(profile)
    }

    pub async fn update_stats(&self, update: &StatsUpdate) -> Result<Profile> {
        let (credential, user_id) = self.signed_in()?;
        self.profile.update_stats(&credential, user_id, update).await
    }

    /// Report an issue as the signed-in user. The backend bumps the
    /// profile's report counters, so the session user is re-read.
    pub async fn report_issue(&self, mut report: NewIssueReport) -> Result<CreatedReport> {
        let (credential, user_id) = self.signed_in()?;
        report.user_id = user_id;
        let created = self.issues.create(&report, Some(&credential)).await?;
        if let Err(e) = self.context.refresh_user().await {
            warn!("failed to refresh user after reporting: {}", e);
        }
        Ok(created)
    }

    pub async fn my_reports(&self, query: &ReportQuery) -> Result<ReportPage> {
        let (credential, user_id) = self.signed_in()?;
        self.issues.for_user(user_id, query, Some(&credential)).await
    }

    pub async fn my_report_stats(&self) -> Result<ReportStats> {
        let (credential, user_id) = self.signed_in()?;
        self.issues.stats(user_id, Some(&credential)).await
    }

    pub async fn comment_on_report(&self, report_id: i64, content: &str) -> Result<ReportComment> {
        let (credential, user_id) = self.signed_in()?;
        self.issues
            .add_comment(report_id, user_id, content, Some(&credential))
            .await
    }

    /// Dashboard for the signed-in user.
    pub async fn my_dashboard(&self) -> Result<Dashboard> {
        let (credential, user_id) = self.signed_in()?;
        self.dashboard.fetch(user_id, Some(&credential)).await
    }

    pub fn profiles(&self) -> &ProfileService {
        &self.profile
    }

    pub fn uploads(&self) -> &UploadService {
        &self.upload
    }

    fn signed_in(&self) -> Result<(Credential, UserId)> {
        let credential = self.context.require_credential()?;
        let user = self.context.current_user().ok_or(ClientError::Unauthenticated)?;
        Ok((credential, user.id()))
    }
}
