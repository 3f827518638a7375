//! Progress of a multi-step operation.

use log::{debug, info};
use solana_sdk::signature::Signature;

use crate::error::{Result, WidgetError};

/// Steps in the order they may occur. Optional steps are skipped, never
/// revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    Idle,
    Crank,
    CreateAccount,
    ClaimRewards,
    Stake,
    Unstake,
    Done,
}

/// Forward-only record of the steps an operation went through.
#[derive(Debug, Clone)]
pub struct StepTracker {
    history: Vec<Step>,
}

impl Default for StepTracker {
    fn default() -> Self {
        Self {
            history: vec![Step::Idle],
        }
    }
}

impl StepTracker {
    pub fn current(&self) -> Step {
        self.history.last().copied().unwrap_or(Step::Idle)
    }

    /// Move to `step`. Going backwards, or anywhere after `Done`, is ignored.
    pub fn advance(&mut self, step: Step) -> bool {
        let current = self.current();
        if step <= current {
            debug!("ignoring step {:?} after {:?}", step, current);
            return false;
        }
        info!("step: {:?}", step);
        self.history.push(step);
        true
    }

    pub fn history(&self) -> &[Step] {
        &self.history
    }

    /// Reach `Done`, whatever happened before.
    pub fn finish(mut self) -> Vec<Step> {
        self.advance(Step::Done);
        self.history
    }
}

/// Result of a lock, unlock or claim.
///
/// `steps` always ends with [`Step::Done`]; a failure is reported in `error`
/// next to it.
#[derive(Debug)]
pub struct OperationOutcome {
    pub steps: Vec<Step>,
    pub signatures: Vec<Signature>,
    /// Tokens locked, unlocked or claimed.
    pub amount: u64,
    pub error: Option<WidgetError>,
}

impl OperationOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Vec<Signature>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.signatures),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_only_move_forward() {
        let mut tracker = StepTracker::default();
        assert!(tracker.advance(Step::Crank));
        assert!(tracker.advance(Step::ClaimRewards));
        assert!(!tracker.advance(Step::CreateAccount));
        assert!(!tracker.advance(Step::ClaimRewards));
        assert_eq!(tracker.current(), Step::ClaimRewards);
        assert_eq!(
            tracker.finish(),
            vec![Step::Idle, Step::Crank, Step::ClaimRewards, Step::Done]
        );
    }

    #[test]
    fn finish_always_reaches_done() {
        assert_eq!(StepTracker::default().finish(), vec![Step::Idle, Step::Done]);
    }

    #[test]
    fn outcome_surfaces_the_error() {
        let outcome = OperationOutcome {
            steps: vec![Step::Idle, Step::Done],
            signatures: vec![],
            amount: 0,
            error: Some(WidgetError::ZeroAmount),
        };
        assert!(!outcome.is_success());
        assert!(matches!(outcome.into_result(), Err(WidgetError::ZeroAmount)));
    }
}
