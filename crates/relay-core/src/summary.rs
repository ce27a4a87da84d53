//! # Payment Summary
//!
//! Per-processor totals over a ledger window.

use crate::ledger::LedgerEntry;
use crate::processor::ProcessorKind;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Totals for one processor tag
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorTotals {
    pub total_requests: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
}

/// Summary keyed by processor tag.
///
/// "default" and "fallback" are always present; other tags appear only
/// when entries carry them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentSummary {
    totals: BTreeMap<String, ProcessorTotals>,
}

impl PaymentSummary {
    /// Summary with zeroed canonical tags
    pub fn empty() -> Self {
        let totals = ProcessorKind::ALL
            .iter()
            .map(|kind| (kind.as_str().to_string(), ProcessorTotals::default()))
            .collect();
        Self { totals }
    }

    /// Group entries by tag
    pub fn from_entries(entries: &[LedgerEntry]) -> Self {
        let mut summary = Self::empty();
        for entry in entries {
            let totals = summary.totals.entry(entry.processor.clone()).or_default();
            totals.total_requests += 1;
            totals.total_amount += entry.amount;
        }
        summary
    }

    /// Totals for a tag
    pub fn get(&self, processor: &str) -> Option<&ProcessorTotals> {
        self.totals.get(processor)
    }

    /// Totals for one of the canonical processors
    pub fn for_kind(&self, kind: ProcessorKind) -> ProcessorTotals {
        self.totals.get(kind.as_str()).copied().unwrap_or_default()
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.totals.keys().map(String::as_str)
    }
}

impl Default for PaymentSummary {
    fn default() -> Self {
        Self::empty()
    }
}
