//! gridscale-policy — the scaling decision engine.
//!
//! [`DefaultEngine`] maps one evaluation cycle's inputs (current count,
//! spec, fresh samples, decision history) to a single [`Decision`].
//!
//! # Decision pipeline
//!
//! ```text
//! per-metric projection      current ± step when a threshold fires
//! aggregation                max | min | average | weighted
//! bounds clamp               [minCount, maxCount]
//! cooldown                   direction-matched, forces back to current
//! stabilization (down only)  max of candidate and in-window history
//! rate limiting              max(1, current * percent / 100) per cycle
//! ```
//!
//! The engine is pure: `now` is part of the input and no shared state
//! is touched, so every decision is reproducible in tests.

pub mod engine;

pub use engine::{
    Decision, DefaultEngine, HistorySample, PolicyEngine, PolicyError, PolicyInput,
};
