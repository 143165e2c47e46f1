use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Document kinds that carry a human-readable reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Appointment,
    Consultation,
    Operation,
    Admission,
    Statement,
    CashEntry,
    CashExit,
}

impl DocumentKind {
    /// Reference prefix printed on the document
    pub fn prefix(&self) -> &'static str {
        match self {
            DocumentKind::Appointment => "APT",
            DocumentKind::Consultation => "CSL",
            DocumentKind::Operation => "OPR",
            DocumentKind::Admission => "ADM",
            DocumentKind::Statement => "STM",
            DocumentKind::CashEntry => "BON",
            DocumentKind::CashExit => "EXT",
        }
    }
}

/// Produces unique human-readable references per document kind
#[async_trait]
pub trait SequenceGenerator: Send + Sync {
    async fn next_reference(&self, kind: DocumentKind) -> String;
}

/// In-memory sequence generator, one counter per document kind
pub struct InMemorySequences {
    counters: Arc<RwLock<HashMap<DocumentKind, u64>>>,
}

impl InMemorySequences {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemorySequences {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SequenceGenerator for InMemorySequences {
    async fn next_reference(&self, kind: DocumentKind) -> String {
        let mut counters = self.counters.write().await;
        let counter = counters.entry(kind).or_insert(0);
        *counter += 1;
        format!("{}-{:06}", kind.prefix(), counter)
    }
}
