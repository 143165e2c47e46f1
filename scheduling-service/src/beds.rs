use crate::error::{SchedulingError, SchedulingResult};
use crate::models::{Bed, BedOccupation, BedState};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

#[derive(Default)]
struct BedRoster {
    beds: HashMap<Uuid, Bed>,
    occupations: HashMap<Uuid, BedOccupation>,
}

/// Bed occupancy state machine
///
/// One lock spans beds and occupations so assign/free check-then-act
/// sequences commit atomically. Freeing a bed parks it in maintenance;
/// an explicit `make_ready` is required before the next assignment.
pub struct BedLifecycle {
    roster: Arc<RwLock<BedRoster>>,
}

impl BedLifecycle {
    pub fn new() -> Self {
        Self {
            roster: Arc::new(RwLock::new(BedRoster::default())),
        }
    }

    /// Register a bed; codes are unique within a service
    pub async fn register_bed(
        &self,
        code: impl Into<String>,
        service_id: Uuid,
    ) -> SchedulingResult<Bed> {
        let code = code.into();
        let mut roster = self.roster.write().await;
        if roster
            .beds
            .values()
            .any(|bed| bed.service_id == service_id && bed.code == code)
        {
            return Err(SchedulingError::validation(
                "code",
                format!("bed code {} already exists in this service", code),
            ));
        }
        let bed = Bed {
            id: Uuid::new_v4(),
            code,
            service_id,
            state: BedState::Free,
        };
        roster.beds.insert(bed.id, bed.clone());
        Ok(bed)
    }

    /// Occupy a free bed and open its occupation record
    pub async fn assign(
        &self,
        bed_id: Uuid,
        patient_id: Uuid,
        admission_id: Uuid,
    ) -> SchedulingResult<BedOccupation> {
        let mut roster = self.roster.write().await;
        let occupation = Self::assign_locked(&mut roster, bed_id, patient_id, admission_id)?;
        info!(%bed_id, %patient_id, "bed assigned");
        Ok(occupation)
    }

    /// Close the open occupation and park the bed in maintenance
    pub async fn free(&self, bed_id: Uuid) -> SchedulingResult<BedOccupation> {
        let mut roster = self.roster.write().await;
        let occupation = Self::free_locked(&mut roster, bed_id)?;
        info!(%bed_id, "bed freed, pending maintenance");
        Ok(occupation)
    }

    /// Return a maintained bed to the free pool
    pub async fn make_ready(&self, bed_id: Uuid) -> SchedulingResult<()> {
        let mut roster = self.roster.write().await;
        let bed = roster
            .beds
            .get_mut(&bed_id)
            .ok_or_else(|| SchedulingError::NotFound(format!("bed {}", bed_id)))?;
        if bed.state != BedState::Maintenance {
            return Err(SchedulingError::illegal_transition("make_ready", bed.state));
        }
        bed.state = BedState::Free;
        Ok(())
    }

    /// Move a patient between beds in one committed step
    pub async fn transfer(
        &self,
        from_bed_id: Uuid,
        to_bed_id: Uuid,
        patient_id: Uuid,
        admission_id: Uuid,
    ) -> SchedulingResult<BedOccupation> {
        let mut roster = self.roster.write().await;
        // Destination must be assignable before the origin is released
        let destination = roster
            .beds
            .get(&to_bed_id)
            .ok_or_else(|| SchedulingError::NotFound(format!("bed {}", to_bed_id)))?;
        if destination.state != BedState::Free {
            return Err(SchedulingError::illegal_transition("assign", destination.state));
        }
        Self::free_locked(&mut roster, from_bed_id)?;
        let occupation = Self::assign_locked(&mut roster, to_bed_id, patient_id, admission_id)?;
        info!(%from_bed_id, %to_bed_id, %patient_id, "bed transfer");
        Ok(occupation)
    }

    pub async fn bed(&self, bed_id: Uuid) -> SchedulingResult<Bed> {
        let roster = self.roster.read().await;
        roster
            .beds
            .get(&bed_id)
            .cloned()
            .ok_or_else(|| SchedulingError::NotFound(format!("bed {}", bed_id)))
    }

    /// The single open occupation on a bed, if any
    pub async fn open_occupation(&self, bed_id: Uuid) -> Option<BedOccupation> {
        let roster = self.roster.read().await;
        roster
            .occupations
            .values()
            .find(|occupation| occupation.bed_id == bed_id && occupation.left_at.is_none())
            .cloned()
    }

    /// Full occupation history of a bed, oldest first
    pub async fn occupations(&self, bed_id: Uuid) -> Vec<BedOccupation> {
        let roster = self.roster.read().await;
        let mut history: Vec<BedOccupation> = roster
            .occupations
            .values()
            .filter(|occupation| occupation.bed_id == bed_id)
            .cloned()
            .collect();
        history.sort_by_key(|occupation| occupation.entered_at);
        history
    }

    fn assign_locked(
        roster: &mut BedRoster,
        bed_id: Uuid,
        patient_id: Uuid,
        admission_id: Uuid,
    ) -> SchedulingResult<BedOccupation> {
        let bed = roster
            .beds
            .get_mut(&bed_id)
            .ok_or_else(|| SchedulingError::NotFound(format!("bed {}", bed_id)))?;
        if bed.state != BedState::Free {
            return Err(SchedulingError::illegal_transition("assign", bed.state));
        }
        bed.state = BedState::Occupied;
        let occupation = BedOccupation {
            id: Uuid::new_v4(),
            bed_id,
            patient_id,
            admission_id,
            entered_at: Utc::now(),
            left_at: None,
        };
        roster.occupations.insert(occupation.id, occupation.clone());
        Ok(occupation)
    }

    fn free_locked(roster: &mut BedRoster, bed_id: Uuid) -> SchedulingResult<BedOccupation> {
        let bed = roster
            .beds
            .get_mut(&bed_id)
            .ok_or_else(|| SchedulingError::NotFound(format!("bed {}", bed_id)))?;
        if bed.state != BedState::Occupied {
            return Err(SchedulingError::illegal_transition("free", bed.state));
        }
        let occupation = roster
            .occupations
            .values_mut()
            .find(|occupation| occupation.bed_id == bed_id && occupation.left_at.is_none())
            .ok_or_else(|| {
                SchedulingError::NotFound(format!("open occupation on bed {}", bed_id))
            })?;
        occupation.left_at = Some(Utc::now());
        let closed = occupation.clone();
        bed.state = BedState::Maintenance;
        Ok(closed)
    }
}

impl Default for BedLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
