/// CRD types for the llm.example.com API group
pub mod api;

/// Reconcilers and their controller scaffolding
pub mod controllers;

/// Child resource synthesis for the serving workload
pub mod serving;

/// Errors, metrics, telemetry and status helpers
pub mod util;

#[cfg(test)]
pub mod fixtures;
