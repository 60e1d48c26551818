//! [`LoopGuard`] – repeated-decision detector.
//!
//! The oracle is allowed to repeat itself (a latched question is re-asked
//! until answered), but a long run of identical calls usually means an
//! episode has stopped making progress. The guard keeps a rolling window of
//! call fingerprints and reports when the last `threshold` are identical.
//!
//! The guard only observes. A latched question stays latched only while the
//! user is silent, and the stock user model always answers a latched
//! question, so with default settings `stalled` stays 0 in practice. It
//! fires for user models that can leave a question unanswered and for
//! thresholds of 1 or 2.
//!
//! # Example
//!
//! ```rust
//! use grasp_runtime::loop_guard::LoopGuard;
//! use grasp_types::ToolCall;
//!
//! let mut guard = LoopGuard::new(3);
//! let call = ToolCall::Approach { obj: "o1".into() };
//!
//! assert!(!guard.record_call(&call).unwrap());
//! assert!(!guard.record_call(&call).unwrap());
//! assert!(guard.record_call(&call).unwrap()); // third repeat
//!
//! guard.reset();
//! assert!(!guard.record_call(&call).unwrap());
//! ```

use std::collections::VecDeque;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use grasp_types::{GraspError, ToolCall};

/// Stable fingerprint of a tool call's wire form.
pub fn fingerprint(call: &ToolCall) -> Result<u64, GraspError> {
    let raw = serde_json::to_string(call).map_err(|e| GraspError::Serialization(e.to_string()))?;
    let mut h = DefaultHasher::new();
    raw.hash(&mut h);
    Ok(h.finish())
}

/// Rolling window over the most recent call fingerprints.
#[derive(Debug, Clone)]
pub struct LoopGuard {
    /// Consecutive identical fingerprints that count as a stall.
    threshold: usize,
    history: VecDeque<u64>,
}

impl LoopGuard {
    /// `threshold` of 0 is treated as 1.
    pub fn new(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            threshold,
            history: VecDeque::with_capacity(threshold),
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Record one fingerprint. Returns `true` while the last `threshold`
    /// fingerprints are identical.
    pub fn record(&mut self, fp: u64) -> bool {
        self.history.push_back(fp);
        while self.history.len() > self.threshold {
            self.history.pop_front();
        }
        self.is_stuck()
    }

    /// Fingerprint and record `call`.
    pub fn record_call(&mut self, call: &ToolCall) -> Result<bool, GraspError> {
        Ok(self.record(fingerprint(call)?))
    }

    pub fn is_stuck(&self) -> bool {
        self.history.len() == self.threshold
            && self.history.iter().all(|fp| *fp == self.history[0])
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grasp_types::{InteractKind, numbered_choices};

    fn approach(obj: &str) -> ToolCall {
        ToolCall::Approach { obj: obj.into() }
    }

    #[test]
    fn varied_calls_never_stall() {
        let mut guard = LoopGuard::new(3);
        assert!(!guard.record_call(&approach("o0")).unwrap());
        assert!(!guard.record_call(&approach("o1")).unwrap());
        assert!(!guard.record_call(&approach("o0")).unwrap());
    }

    #[test]
    fn stall_persists_until_broken() {
        let mut guard = LoopGuard::new(4);
        for _ in 0..3 {
            assert!(!guard.record_call(&approach("o0")).unwrap());
        }
        assert!(guard.record_call(&approach("o0")).unwrap());
        assert!(guard.record_call(&approach("o0")).unwrap());
        assert!(!guard.record_call(&ToolCall::AlignYaw { obj: "o0".into() }).unwrap());
    }

    #[test]
    fn same_target_different_tool_differs() {
        assert_ne!(
            fingerprint(&approach("o0")).unwrap(),
            fingerprint(&ToolCall::AlignYaw { obj: "o0".into() }).unwrap()
        );
    }

    #[test]
    fn identical_prompts_share_a_fingerprint() {
        let ask = || {
            ToolCall::interact(
                InteractKind::Confirm,
                "Do you want me to approach the mug?",
                numbered_choices(&["YES", "NO"]),
            )
        };
        assert_eq!(fingerprint(&ask()).unwrap(), fingerprint(&ask()).unwrap());
    }

    #[test]
    fn zero_threshold_behaves_like_one() {
        let mut guard = LoopGuard::new(0);
        assert_eq!(guard.threshold(), 1);
        assert!(guard.record(7));
    }
}
