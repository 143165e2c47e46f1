use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Third-party payer agreement with its own pricelist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Convention {
    pub id: Uuid,
    pub name: String,
}

impl Convention {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

/// A patient's enrollment under a convention
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientCoverage {
    pub convention_id: Uuid,
    pub end_date: Option<NaiveDate>,
    pub active: bool,
}

impl PatientCoverage {
    pub fn new(convention_id: Uuid) -> Self {
        Self {
            convention_id,
            end_date: None,
            active: true,
        }
    }

    pub fn until(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Coverage applies when marked active and not past its end date
    pub fn covers(&self, as_of: NaiveDate) -> bool {
        self.active && self.end_date.map_or(true, |end| as_of <= end)
    }
}

/// Registry of conventions, patient enrollments, and doctor share rates
pub struct ConventionDirectory {
    conventions: Arc<RwLock<HashMap<Uuid, Convention>>>,
    coverages: Arc<RwLock<HashMap<Uuid, PatientCoverage>>>,
    share_rates: Arc<RwLock<HashMap<Uuid, Decimal>>>,
}

impl ConventionDirectory {
    pub fn new() -> Self {
        Self {
            conventions: Arc::new(RwLock::new(HashMap::new())),
            coverages: Arc::new(RwLock::new(HashMap::new())),
            share_rates: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn register_convention(&self, convention: Convention) -> Uuid {
        let id = convention.id;
        self.conventions.write().await.insert(id, convention);
        id
    }

    pub async fn set_patient_coverage(&self, patient_id: Uuid, coverage: PatientCoverage) {
        self.coverages.write().await.insert(patient_id, coverage);
    }

    /// The patient's coverage if it applies on the given date
    pub async fn active_coverage(&self, patient_id: Uuid, as_of: NaiveDate) -> Option<PatientCoverage> {
        let coverages = self.coverages.read().await;
        coverages
            .get(&patient_id)
            .filter(|coverage| coverage.covers(as_of))
            .cloned()
    }

    /// Configured revenue-share percentage for a doctor
    pub async fn set_doctor_share_rate(&self, doctor_id: Uuid, percentage: Decimal) {
        self.share_rates.write().await.insert(doctor_id, percentage);
    }

    /// Doctor's share percentage, zero when none is configured
    pub async fn doctor_share_rate(&self, doctor_id: Uuid) -> Decimal {
        let rates = self.share_rates.read().await;
        rates.get(&doctor_id).copied().unwrap_or(Decimal::ZERO)
    }
}

impl Default for ConventionDirectory {
    fn default() -> Self {
        Self::new()
    }
}
