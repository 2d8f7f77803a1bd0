//! Multi-step emergency report form.
//!
//! The form walks Reporter → Incident → Review. Each `advance` checks the
//! fields of the step being left, so a draft can only reach Review once
//! everything the backend requires is present.

use ecoaction_types::api::NewEmergencyReport;
use ecoaction_types::models::Severity;

use crate::auth::validate_email;
use crate::error::{ClientError, Result};

const MAX_NAME_LEN: usize = 100;
const MAX_PHONE_LEN: usize = 20;
const MAX_TYPE_LEN: usize = 100;
const MAX_LOCATION_LEN: usize = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportStep {
    #[default]
    Reporter,
    Incident,
    Review,
}

impl ReportStep {
    /// 1-based position, as shown in the form header.
    pub fn number(&self) -> u8 {
        match self {
            Self::Reporter => 1,
            Self::Incident => 2,
            Self::Review => 3,
        }
    }

    fn next(self) -> Self {
        match self {
            Self::Reporter => Self::Incident,
            Self::Incident | Self::Review => Self::Review,
        }
    }

    fn previous(self) -> Self {
        match self {
            Self::Reporter | Self::Incident => Self::Reporter,
            Self::Review => Self::Incident,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReportDraft {
    step: ReportStep,
    pub report: NewEmergencyReport,
}

impl ReportDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> ReportStep {
        self.step
    }

    pub fn set_reporter(&mut self, name: Option<String>, phone: Option<String>, email: Option<String>) {
        self.report.reporter_name = non_blank(name);
        self.report.reporter_phone = non_blank(phone);
        self.report.reporter_email = non_blank(email);
    }

    pub fn set_incident(
        &mut self,
        emergency_type: impl Into<String>,
        location: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
    ) {
        self.report.emergency_type = emergency_type.into();
        self.report.location = location.into();
        self.report.description = description.into();
        self.report.severity = severity;
    }

    /// Validate the current step and move to the next one.
    pub fn advance(&mut self) -> Result<ReportStep> {
        match self.step {
            ReportStep::Reporter => validate_reporter(&self.report)?,
            ReportStep::Incident => validate_incident(&self.report)?,
            ReportStep::Review => {}
        }
        self.step = self.step.next();
        Ok(self.step)
    }

    pub fn back(&mut self) -> ReportStep {
        self.step = self.step.previous();
        self.step
    }

    /// The finished report. Only available from the Review step.
    pub fn finish(self) -> Result<NewEmergencyReport> {
        if self.step != ReportStep::Review {
            return Err(ClientError::Validation(
                "Complete all steps before submitting".into(),
            ));
        }
        validate_report(&self.report)?;
        Ok(self.report)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn validate_reporter(report: &NewEmergencyReport) -> Result<()> {
    if let Some(name) = present(&report.reporter_name) {
        if name.chars().count() > MAX_NAME_LEN {
            return Err(ClientError::Validation(format!(
                "Name must be at most {} characters",
                MAX_NAME_LEN
            )));
        }
    }
    if let Some(phone) = present(&report.reporter_phone) {
        if phone.chars().count() > MAX_PHONE_LEN {
            return Err(ClientError::Validation(format!(
                "Phone number must be at most {} characters",
                MAX_PHONE_LEN
            )));
        }
    }
    if let Some(email) = present(&report.reporter_email) {
        validate_email(email)?;
    }
    Ok(())
}

fn validate_incident(report: &NewEmergencyReport) -> Result<()> {
    let kind = report.emergency_type.trim().chars().count();
    if !(1..=MAX_TYPE_LEN).contains(&kind) {
        return Err(ClientError::Validation("Emergency type is required".into()));
    }
    let location = report.location.trim().chars().count();
    if !(1..=MAX_LOCATION_LEN).contains(&location) {
        return Err(ClientError::Validation(format!(
            "Location must be between 1 and {} characters",
            MAX_LOCATION_LEN
        )));
    }
    if report.description.trim().is_empty() {
        return Err(ClientError::Validation("Description is required".into()));
    }
    Ok(())
}

/// Every field check the backend's report schema applies.
pub fn validate_report(report: &NewEmergencyReport) -> Result<()> {
    validate_reporter(report)?;
    validate_incident(report)
}
