use std::sync::Arc;

use apalis::prelude::{Attempt, Error};
use eyre::Report;
use log::{info, warn};

mod execution_handler;
pub use execution_handler::*;

mod reconciliation_handler;
pub use reconciliation_handler::*;

mod verification_handler;
pub use verification_handler::*;

mod treasury_handler;
pub use treasury_handler::*;

mod alert_handler;
pub use alert_handler::*;

/// Maps a handler outcome onto the queue's retry machinery: a transient
/// failure requeues the job, and the attempt ceiling converts it into an
/// abort so the job stops cycling.
pub fn handle_result(
    result: Result<(), Report>,
    attempt: Attempt,
    job_type: &str,
    max_attempts: usize,
) -> Result<(), Error> {
    let err = match result {
        Ok(()) => {
            info!("{} job completed", job_type);
            return Ok(());
        }
        Err(err) => err,
    };

    if attempt.current() >= max_attempts {
        warn!(
            "{} job exhausted {} attempts: {:?}",
            job_type, max_attempts, err
        );
        return Err(Error::Abort(Arc::new("Attempt ceiling reached".into())));
    }

    warn!(
        "{} job failed on attempt {}: {:?}",
        job_type,
        attempt.current(),
        err
    );
    Err(Error::Failed(Arc::new(
        "Requeued for another attempt".into(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use apalis::prelude::Attempt;

    #[test]
    fn test_successful_outcome_passes_through() {
        let outcome = handle_result(Ok(()), Attempt::default(), "alert", 3);
        assert!(outcome.is_ok());
    }

    #[test]
    fn test_transient_failure_requeues() {
        let outcome = handle_result(
            Err(Report::msg("redis unreachable")),
            Attempt::default(),
            "alert",
            3,
        );
        assert!(matches!(outcome, Err(Error::Failed(_))));
    }

    #[test]
    fn test_attempt_ceiling_aborts() {
        let attempt = Attempt::default();
        for _ in 0..3 {
            attempt.increment();
        }

        let outcome = handle_result(Err(Report::msg("redis unreachable")), attempt, "alert", 3);
        assert!(matches!(outcome, Err(Error::Abort(_))));
    }
}
