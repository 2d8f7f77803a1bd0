use tracing::info;

use ecoaction_types::api::{Data, NewEmergencyReport};
use ecoaction_types::models::{EmergencyAlert, EmergencyContact, EmergencyInsights, EmergencyReport};

use crate::error::Result;
use crate::http::ApiClient;
use crate::report::validate_report;

/// `/emergency/*` endpoints. All of them are public.
#[derive(Clone)]
pub struct EmergencyService {
    api: ApiClient,
}

impl EmergencyService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn insights(&self) -> Result<EmergencyInsights> {
        let resp: Data<EmergencyInsights> = self.api.get("/emergency/insights", None).await?;
        Ok(resp.data)
    }

    /// Active alerts, newest first.
    pub async fn alerts(&self) -> Result<Vec<EmergencyAlert>> {
        let resp: Data<Vec<EmergencyAlert>> = self.api.get("/emergency/alerts", None).await?;
        Ok(resp.data)
    }

    /// At most five active High/Critical alerts.
    pub async fn priority_alerts(&self) -> Result<Vec<EmergencyAlert>> {
        let resp: Data<Vec<EmergencyAlert>> = self.api.get("/emergency/alerts/priority", None).await?;
        Ok(resp.data)
    }

    pub async fn contacts(&self, service: Option<&str>) -> Result<Vec<EmergencyContact>> {
        let query: Vec<(&str, String)> = service
            .filter(|s| !s.trim().is_empty())
            .map(|s| vec![("service", s.to_string())])
            .unwrap_or_default();
        let resp: Data<Vec<EmergencyContact>> = self
            .api
            .get_with_query("/emergency/contacts", &query, None)
            .await?;
        Ok(resp.data)
    }

    pub async fn submit_report(&self, report: &NewEmergencyReport) -> Result<EmergencyReport> {
        validate_report(report)?;
        let resp: Data<EmergencyReport> = self.api.post_json("/emergency/reports", report, None).await?;
        info!(report_id = resp.data.id, severity = ?report.severity, "emergency report submitted");
        Ok(resp.data)
    }

    pub async fn reports(&self) -> Result<Vec<EmergencyReport>> {
        let resp: Data<Vec<EmergencyReport>> = self.api.get("/emergency/reports", None).await?;
        Ok(resp.data)
    }
}
