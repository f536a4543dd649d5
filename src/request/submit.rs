use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::api::ConsoleApi;
use crate::error::SubmitError;

use super::builder::build_job;
use super::state::{Action, ConsoleState, reduce};

#[derive(Debug, Default)]
pub struct SingleFlight {
    busy: AtomicBool,
}

#[derive(Debug)]
pub struct FlightGuard<'a> {
    busy: &'a AtomicBool,
}

impl SingleFlight {
    pub fn try_begin(&self) -> Option<FlightGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard { busy: &self.busy })
    }

    #[cfg(test)]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[derive(Debug)]
pub struct EvaluationSubmitter<A> {
    api: A,
    flight: SingleFlight,
}

impl<A: ConsoleApi> EvaluationSubmitter<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            flight: SingleFlight::default(),
        }
    }

    #[cfg(test)]
    pub fn api(&self) -> &A {
        &self.api
    }

    #[cfg(test)]
    pub fn is_in_flight(&self) -> bool {
        self.flight.is_busy()
    }

    pub fn submit(&self, state: ConsoleState) -> ConsoleState {
        let Some(_guard) = self.flight.try_begin() else {
            warn!("evaluation submit refused while another is in flight");
            return reduce(state, Action::SubmitBlocked(SubmitError::AlreadyInProgress));
        };

        let state = reduce(state, Action::SubmitStarted);

        let payload = match build_job(&state).and_then(|job| job.to_payload()) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "evaluation submit rejected");
                return reduce(state, Action::SubmitRejected(err));
            }
        };

        info!(
            file = %payload.file_name,
            num_questions = %payload.num_questions,
            "sending evaluation request"
        );

        match self.api.evaluate(&payload) {
            Ok(report) => {
                info!(bytes = report.content.len(), "evaluation report received");
                reduce(state, Action::SubmitSucceeded(report))
            }
            Err(err) => {
                warn!(error = %err, "evaluation request failed");
                reduce(state, Action::SubmitFailed(err.to_string()))
            }
        }
    }
}
