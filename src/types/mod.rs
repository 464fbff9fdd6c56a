//! Type definitions for the claim triage pipeline

pub mod claim;
pub mod verdict;

pub use claim::{ClaimRecord, ClaimTable, FieldValue, FraudLabel};
pub use verdict::{
    CombinedVerdict, FlagSource, InvestigationEntry, OutlierVerdict, RiskVerdict, Worklist,
};
