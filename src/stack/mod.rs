//! Stacked diff module
//!
//! This module implements the core stacked-diff engine:
//! - Deterministic branch naming from commit metadata
//! - Commit-indicator resolution (hash / PR number / list position)
//! - Merged-commit detection for trunk rebasing
//! - Rebase-plan rewriting for the sequence-editor protocol
//! - The orchestrator state machines for new/update/replace/rebase-main

pub mod merged;
pub mod namer;
pub mod orchestrator;
pub mod plan;
pub mod resolver;

pub use merged::{merged_candidates, DropCandidate};
pub use namer::BranchNamer;
pub use orchestrator::StackedDiffOrchestrator;
pub use resolver::{BranchInfo, IndicatorResolver, IndicatorType};
