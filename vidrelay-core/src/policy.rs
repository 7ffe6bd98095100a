//! Failure policy for outbound calls.
//!
//! Primary lookups propagate their errors; enrichment lookups degrade to a
//! fallback value. The policy is passed at each call site so the contract is
//! visible where the request is made.

use std::fmt::Display;

/// How the outcome of a single outbound call affects the surrounding operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPolicy {
    /// Failure aborts the operation.
    Required,
    /// Failure is logged and replaced by a fallback value.
    BestEffort,
}

impl CallPolicy {
    /// Applies the policy to a call outcome.
    ///
    /// `Required` passes the result through untouched. `BestEffort` logs the
    /// error at `warn` and substitutes `fallback()`.
    ///
    /// # Errors
    ///
    /// - `E` - Only under `CallPolicy::Required`, the call's own error
    pub fn settle<T, E, F>(self, call: &str, result: Result<T, E>, fallback: F) -> Result<T, E>
    where
        E: Display,
        F: FnOnce() -> T,
    {
        match (self, result) {
            (_, Ok(value)) => Ok(value),
            (CallPolicy::Required, Err(e)) => Err(e),
            (CallPolicy::BestEffort, Err(e)) => {
                tracing::warn!("{call} failed, continuing without it: {e}");
                Ok(fallback())
            }
        }
    }

    /// Same as [`settle`](Self::settle) with `T::default()` as the fallback.
    ///
    /// # Errors
    ///
    /// - `E` - Only under `CallPolicy::Required`, the call's own error
    pub fn settle_or_default<T, E>(self, call: &str, result: Result<T, E>) -> Result<T, E>
    where
        T: Default,
        E: Display,
    {
        self.settle(call, result, T::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_propagates_error() {
        let result: Result<Vec<u8>, String> = Err("boom".to_string());
        let settled = CallPolicy::Required.settle_or_default("details", result);
        assert_eq!(settled, Err("boom".to_string()));
    }

    #[test]
    fn test_best_effort_substitutes_fallback() {
        let result: Result<Option<String>, String> = Err("connection reset".to_string());
        let settled = CallPolicy::BestEffort.settle("playlist", result, || None);
        assert_eq!(settled, Ok(None));
    }

    #[test]
    fn test_success_is_untouched_under_both_policies() {
        for policy in [CallPolicy::Required, CallPolicy::BestEffort] {
            let result: Result<u32, String> = Ok(7);
            assert_eq!(policy.settle("call", result, || 0), Ok(7));
        }
    }
}
