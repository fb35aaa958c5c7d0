//! Contract Tests - Pipeline Invariant Protection
//!
//! This file aggregates all contract test modules.
//! Contract tests verify invariants that MUST NEVER BREAK.

// Contract test modules
mod contracts {
    // Drill-down lifecycle and context layering contracts
    mod pipeline {
        include!("pipeline_contracts.rs");
    }

    // File resolution and configuration contracts
    mod distributor {
        include!("distributor_contracts.rs");
    }
}
