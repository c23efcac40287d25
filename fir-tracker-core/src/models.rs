//! Core domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::CoreError;

/// Investigation status of a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseStatus {
    #[serde(rename = "On Track")]
    OnTrack,
    Critical,
    Default,
    Completed,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::OnTrack => "On Track",
            CaseStatus::Critical => "Critical",
            CaseStatus::Default => "Default",
            CaseStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Investigation quality, graded once the case is completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseQuality {
    Excellent,
    Good,
    Default,
    Pending,
}

impl CaseQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseQuality::Excellent => "Excellent",
            CaseQuality::Good => "Good",
            CaseQuality::Default => "Default",
            CaseQuality::Pending => "Pending",
        }
    }
}

impl fmt::Display for CaseQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ESakshiStatus {
    Completed,
    #[default]
    Pending,
    #[serde(rename = "N/A")]
    NotApplicable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FslVisit {
    Yes,
    #[default]
    No,
}

/// A First Information Report and the state of its investigation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    /// Unique identifier
    pub id: Uuid,
    /// FIR number, the immutable business key
    pub fir_number: String,
    /// Filing date; anchors the investigation-age clock
    pub fir_date: Option<DateTime<Utc>>,

    pub police_station: String,
    pub sub_division: String,

    /// Investigating officer
    pub io_name: String,
    /// Investigating officer's contact number, as entered
    pub io_phone: String,

    /// IPC/BNS sections
    pub sections: String,
    pub crime_brief: String,

    /// Whole days elapsed since the FIR date (derived)
    pub days_elapsed: u32,
    /// Derived
    pub status: CaseStatus,
    /// Derived
    pub quality: CaseQuality,

    /// Charge-sheet (CC) number, set on completion
    pub cc_number: String,
    /// Charge-sheet date, set on completion
    pub cc_date: Option<DateTime<Utc>>,
    pub is_completed: bool,

    pub e_sakshi_id: String,
    pub e_sakshi_status: ESakshiStatus,
    pub fsl_visit: FslVisit,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Case {
    /// Create an open case. Derived fields start at their defaults until the
    /// first recompute.
    pub fn new(
        fir_number: String,
        fir_date: DateTime<Utc>,
        io_phone: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            fir_number,
            fir_date: Some(fir_date),
            police_station: String::new(),
            sub_division: String::new(),
            io_name: String::new(),
            io_phone,
            sections: String::new(),
            crime_brief: String::new(),
            days_elapsed: 0,
            status: CaseStatus::OnTrack,
            quality: CaseQuality::Pending,
            cc_number: String::new(),
            cc_date: None,
            is_completed: false,
            e_sakshi_id: String::new(),
            e_sakshi_status: ESakshiStatus::default(),
            fsl_visit: FslVisit::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_open(&self) -> bool {
        !self.is_completed
    }

    /// Apply a partial update. Clock-relevant fields change here, so callers
    /// must recompute afterwards.
    pub fn apply(&mut self, patch: UpdateCaseRequest) -> Result<(), CoreError> {
        if let Some(fir_number) = patch.fir_number {
            if fir_number.trim() != self.fir_number {
                return Err(CoreError::FirNumberImmutable {
                    stored: self.fir_number.clone(),
                    requested: fir_number,
                });
            }
        }
        if let Some(fir_date) = patch.fir_date {
            if self.is_completed && self.fir_date != Some(fir_date) {
                return Err(CoreError::AlreadyCompleted(self.fir_number.clone()));
            }
            self.fir_date = Some(fir_date);
        }

        set_if_present(&mut self.police_station, patch.police_station);
        set_if_present(&mut self.sub_division, patch.sub_division);
        set_if_present(&mut self.io_name, patch.io_name);
        set_if_present(&mut self.io_phone, patch.io_phone);
        set_if_present(&mut self.sections, patch.sections);
        set_if_present(&mut self.crime_brief, patch.crime_brief);
        set_if_present(&mut self.e_sakshi_id, patch.e_sakshi_id);
        if let Some(status) = patch.e_sakshi_status {
            self.e_sakshi_status = status;
        }
        if let Some(visit) = patch.fsl_visit {
            self.fsl_visit = visit;
        }
        Ok(())
    }

    /// Mark the investigation complete. Without an explicit charge-sheet date
    /// the completion instant is used.
    pub fn complete(
        &mut self,
        cc_number: String,
        cc_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        if self.is_completed {
            return Err(CoreError::AlreadyCompleted(self.fir_number.clone()));
        }
        if cc_number.trim().is_empty() {
            return Err(CoreError::MissingField("cc_number"));
        }
        let cc_date = cc_date.unwrap_or(now);
        if let Some(fir_date) = self.fir_date {
            if cc_date < fir_date {
                return Err(CoreError::InvalidCase(format!(
                    "charge-sheet date {} is before FIR date {}",
                    cc_date.date_naive(),
                    fir_date.date_naive()
                )));
            }
        }
        self.cc_number = cc_number.trim().to_string();
        self.cc_date = Some(cc_date);
        self.is_completed = true;
        Ok(())
    }
}

fn set_if_present(field: &mut String, value: Option<String>) {
    if let Some(value) = value {
        *field = value;
    }
}

/// Which alert threshold a case has reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertTier {
    /// Exactly at the reminder day
    Reminder,
    /// Exactly at the critical day
    Critical,
    /// Past the critical day; fires on every sweep
    Overdue,
}

impl fmt::Display for AlertTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlertTier::Reminder => "reminder",
            AlertTier::Critical => "critical",
            AlertTier::Overdue => "overdue",
        };
        f.write_str(name)
    }
}

/// A notification to be delivered for one case during one sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub case_id: Uuid,
    pub fir_number: String,
    pub threshold_crossed: AlertTier,
    /// Normalized recipient, country code included
    pub recipient: String,
    pub template_id: String,
    /// Positional template parameters
    pub parameters: Vec<String>,
}

/// Request to register a new case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCaseRequest {
    pub fir_number: String,
    pub fir_date: DateTime<Utc>,
    pub police_station: String,
    pub sub_division: String,
    pub io_name: String,
    pub io_phone: String,
    pub sections: String,
    pub crime_brief: String,
    #[serde(default)]
    pub e_sakshi_id: Option<String>,
    #[serde(default)]
    pub e_sakshi_status: Option<ESakshiStatus>,
    #[serde(default)]
    pub fsl_visit: Option<FslVisit>,
}

impl CreateCaseRequest {
    /// Check that every required text field is present
    pub fn validate(&self) -> Result<(), CoreError> {
        let required = [
            ("fir_number", &self.fir_number),
            ("police_station", &self.police_station),
            ("sub_division", &self.sub_division),
            ("io_name", &self.io_name),
            ("io_phone", &self.io_phone),
            ("sections", &self.sections),
            ("crime_brief", &self.crime_brief),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(CoreError::MissingField(name));
            }
        }
        Ok(())
    }

    /// Build the case record. Derived fields are not yet computed.
    pub fn into_case(self, now: DateTime<Utc>) -> Result<Case, CoreError> {
        self.validate()?;
        let fir_number = self.fir_number.trim().to_string();
        let mut case = Case::new(fir_number, self.fir_date, self.io_phone, now);
        case.police_station = self.police_station;
        case.sub_division = self.sub_division;
        case.io_name = self.io_name;
        case.sections = self.sections;
        case.crime_brief = self.crime_brief;
        case.e_sakshi_id = self.e_sakshi_id.unwrap_or_default();
        case.e_sakshi_status = self.e_sakshi_status.unwrap_or_default();
        case.fsl_visit = self.fsl_visit.unwrap_or_default();
        Ok(case)
    }
}

/// Partial update of a case; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateCaseRequest {
    pub fir_number: Option<String>,
    pub fir_date: Option<DateTime<Utc>>,
    pub police_station: Option<String>,
    pub sub_division: Option<String>,
    pub io_name: Option<String>,
    pub io_phone: Option<String>,
    pub sections: Option<String>,
    pub crime_brief: Option<String>,
    pub e_sakshi_id: Option<String>,
    pub e_sakshi_status: Option<ESakshiStatus>,
    pub fsl_visit: Option<FslVisit>,
}

/// Request to mark a case as completed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteCaseRequest {
    pub cc_number: String,
    #[serde(default)]
    pub cc_date: Option<DateTime<Utc>>,
}

/// Listing filter; every set field must match
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseFilter {
    pub status: Option<CaseStatus>,
    pub police_station: Option<String>,
    pub sub_division: Option<String>,
    /// Case-insensitive substring match
    pub io_name: Option<String>,
    pub is_completed: Option<bool>,
}

impl CaseFilter {
    pub fn open() -> Self {
        Self {
            is_completed: Some(false),
            ..Default::default()
        }
    }

    pub fn matches(&self, case: &Case) -> bool {
        if let Some(status) = self.status {
            if case.status != status {
                return false;
            }
        }
        if let Some(station) = &self.police_station {
            if &case.police_station != station {
                return false;
            }
        }
        if let Some(sub_division) = &self.sub_division {
            if &case.sub_division != sub_division {
                return false;
            }
        }
        if let Some(io_name) = &self.io_name {
            if !case.io_name.to_lowercase().contains(&io_name.to_lowercase()) {
                return false;
            }
        }
        if let Some(is_completed) = self.is_completed {
            if case.is_completed != is_completed {
                return false;
            }
        }
        true
    }
}
