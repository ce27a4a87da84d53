//! # Ledger
//!
//! Append-only record of settled payments, scored by write time.
//!
//! The ledger sits on top of an opaque sorted store: one collection, members
//! are JSON `LedgerEntry` records, score is the UTC unix-seconds timestamp.
//! Range queries select candidates by score and then filter on the exact
//! timestamp of each decoded entry.
//!
//! Malformed members are skipped and logged; they never fail a query.

use crate::error::{RelayError, RelayResult};
use crate::processor::ProcessorKind;
use crate::summary::PaymentSummary;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

/// Name of the sorted collection holding ledger entries
pub const LEDGER_KEY: &str = "payment:summary";

/// One settled payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// Processor tag ("default" or "fallback")
    pub processor: String,

    /// Request this entry settles
    pub correlation_id: Uuid,

    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,

    /// Write time, UTC
    pub timestamp: DateTime<Utc>,
}

impl LedgerEntry {
    /// Score used by the sorted store (second resolution)
    pub fn score(&self) -> i64 {
        self.timestamp.timestamp()
    }
}

/// Opaque sorted-by-score collection.
///
/// Single-member adds are assumed atomic; nothing else is coordinated.
#[async_trait]
pub trait SortedStore: Send + Sync {
    /// Add a member with the given score
    async fn add(&self, score: i64, member: String) -> RelayResult<()>;

    /// All members with `min <= score <= max`, ascending by score
    async fn range_by_score(&self, min: i64, max: i64) -> RelayResult<Vec<String>>;
}

/// Type alias for a shared store
pub type BoxedSortedStore = Arc<dyn SortedStore>;

/// In-process sorted store for tests and local runs.
#[derive(Default, Clone)]
pub struct InMemorySortedStore {
    members: Arc<RwLock<BTreeMap<i64, Vec<String>>>>,
}

impl InMemorySortedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored members
    pub async fn len(&self) -> usize {
        self.members.read().await.values().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SortedStore for InMemorySortedStore {
    async fn add(&self, score: i64, member: String) -> RelayResult<()> {
        let mut members = self.members.write().await;
        members.entry(score).or_default().push(member);
        Ok(())
    }

    async fn range_by_score(&self, min: i64, max: i64) -> RelayResult<Vec<String>> {
        if min > max {
            return Ok(Vec::new());
        }
        let members = self.members.read().await;
        Ok(members
            .range(min..=max)
            .flat_map(|(_, bucket)| bucket.iter().cloned())
            .collect())
    }
}

/// Write/range-query front of the sorted store
#[derive(Clone)]
pub struct Ledger {
    store: BoxedSortedStore,
}

impl Ledger {
    pub fn new(store: BoxedSortedStore) -> Self {
        Self { store }
    }

    /// Record a settlement stamped with the current time
    pub async fn append(
        &self,
        processor: ProcessorKind,
        correlation_id: Uuid,
        amount: Decimal,
    ) -> RelayResult<LedgerEntry> {
        let entry = LedgerEntry {
            processor: processor.as_str().to_string(),
            correlation_id,
            amount,
            timestamp: Utc::now(),
        };
        self.insert(&entry).await?;
        Ok(entry)
    }

    /// Store a fully built entry
    pub async fn insert(&self, entry: &LedgerEntry) -> RelayResult<()> {
        let member = serde_json::to_string(entry)
            .map_err(|e| RelayError::Serialization(format!("ledger entry: {}", e)))?;
        self.store.add(entry.score(), member).await?;
        debug!(
            processor = %entry.processor,
            correlation_id = %entry.correlation_id,
            amount = %entry.amount,
            "Ledger entry appended"
        );
        Ok(())
    }

    /// Entries with `from <= timestamp <= to`
    pub async fn range_query(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RelayResult<Vec<LedgerEntry>> {
        if from > to {
            return Ok(Vec::new());
        }

        let members = self
            .store
            .range_by_score(from.timestamp(), to.timestamp())
            .await?;

        Ok(decode_entries(members)
            .into_iter()
            .filter(|entry| entry.timestamp >= from && entry.timestamp <= to)
            .collect())
    }

    /// Aggregate a window per processor tag
    pub async fn summary(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RelayResult<PaymentSummary> {
        let entries = self.range_query(from, to).await?;
        Ok(PaymentSummary::from_entries(&entries))
    }
}

/// Decode stored members, skipping the ones that don't parse
pub fn decode_entries(members: Vec<String>) -> Vec<LedgerEntry> {
    members
        .into_iter()
        .filter_map(|member| match decode_entry(&member) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Skipping ledger record");
                None
            }
        })
        .collect()
}

fn decode_entry(member: &str) -> RelayResult<LedgerEntry> {
    serde_json::from_str(member).map_err(|e| RelayError::MalformedRecord(e.to_string()))
}
