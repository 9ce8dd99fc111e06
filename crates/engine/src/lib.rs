//! Query orchestration for sleuth.
//!
//! Expands a query into variants, serves them from cache or cheap search
//! providers, decides whether a headless-browser pass is worth its cost,
//! merges everything into a bounded context, and synthesizes an answer,
//! all under one wall-clock budget.

pub mod automation;
pub mod budget;
pub mod decider;
pub mod merger;
pub mod orchestrator;
pub mod planner;
pub mod retrieval;
pub mod synthesizer;

pub use automation::{AutomationConfig, BrowserAutomationEngine, PageError};
pub use budget::Budget;
pub use decider::{AutomationDecider, DeciderConfig, evaluate_rules};
pub use merger::{ContextItem, MergeConfig, MergedContext, merge};
pub use orchestrator::{Collaborators, Orchestrator};
pub use planner::{PlannerConfig, QueryPlanner};
pub use retrieval::{RetrievalConfig, RetrievalEngine};
pub use synthesizer::{AnswerSynthesizer, INSUFFICIENT_ANSWER, Synthesis, SynthesisConfig};
