use crate::error::{CoreError, CoreResult};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A billable medical act from the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalAct {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub family: Option<String>,
    pub list_price: Decimal,
}

impl MedicalAct {
    pub fn new(code: impl Into<String>, name: impl Into<String>, list_price: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            name: name.into(),
            family: None,
            list_price,
        }
    }

    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = Some(family.into());
        self
    }
}

/// Pricing catalog consumed by the cashdesk
#[async_trait]
pub trait PricingCatalog: Send + Sync {
    /// Public list price of an act
    async fn list_price(&self, act_id: Uuid) -> CoreResult<Decimal>;

    /// Negotiated price of an act under a convention pricelist; falls back
    /// to the list price when the pricelist has no line for the act
    async fn convention_price(&self, act_id: Uuid, convention_id: Uuid) -> CoreResult<Decimal>;

    /// Catalog entry for designation snapshots
    async fn act(&self, act_id: Uuid) -> CoreResult<MedicalAct>;
}

/// In-memory catalog of acts and convention pricelists
pub struct InMemoryCatalog {
    acts: Arc<RwLock<HashMap<Uuid, MedicalAct>>>,
    pricelists: Arc<RwLock<HashMap<Uuid, HashMap<Uuid, Decimal>>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self {
            acts: Arc::new(RwLock::new(HashMap::new())),
            pricelists: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn register_act(&self, act: MedicalAct) -> Uuid {
        let id = act.id;
        self.acts.write().await.insert(id, act);
        id
    }

    /// Set the negotiated price of an act on a convention's pricelist
    pub async fn set_convention_price(&self, convention_id: Uuid, act_id: Uuid, price: Decimal) {
        self.pricelists
            .write()
            .await
            .entry(convention_id)
            .or_default()
            .insert(act_id, price);
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PricingCatalog for InMemoryCatalog {
    async fn list_price(&self, act_id: Uuid) -> CoreResult<Decimal> {
        let acts = self.acts.read().await;
        acts.get(&act_id)
            .map(|act| act.list_price)
            .ok_or_else(|| CoreError::NotFound(format!("No act in catalog: {}", act_id)))
    }

    async fn convention_price(&self, act_id: Uuid, convention_id: Uuid) -> CoreResult<Decimal> {
        let pricelists = self.pricelists.read().await;
        if let Some(price) = pricelists
            .get(&convention_id)
            .and_then(|pricelist| pricelist.get(&act_id))
        {
            return Ok(*price);
        }
        drop(pricelists);
        self.list_price(act_id).await
    }

    async fn act(&self, act_id: Uuid) -> CoreResult<MedicalAct> {
        let acts = self.acts.read().await;
        acts.get(&act_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("No act in catalog: {}", act_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_convention_price_falls_back_to_list_price() {
        let catalog = InMemoryCatalog::new();
        let act_id = catalog
            .register_act(MedicalAct::new("ACT001", "Consultation", dec!(2000)))
            .await;
        let convention_id = Uuid::new_v4();

        // No pricelist line yet
        assert_eq!(
            catalog.convention_price(act_id, convention_id).await.unwrap(),
            dec!(2000)
        );

        catalog
            .set_convention_price(convention_id, act_id, dec!(1500))
            .await;
        assert_eq!(
            catalog.convention_price(act_id, convention_id).await.unwrap(),
            dec!(1500)
        );
    }

    #[tokio::test]
    async fn test_unknown_act_is_not_found() {
        let catalog = InMemoryCatalog::new();
        assert!(catalog.list_price(Uuid::new_v4()).await.is_err());
    }
}
