use std::collections::VecDeque;
use std::fmt::{self, Debug, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error};
use loadsign_core::Error;

use crate::config::PendingPolicy;
use crate::host::{Done, EventEmitter, ExecutionContext, RequestParams};
use crate::sdk::SDK_CONFIG_INVALID;
use crate::sign::SigningMaterial;

/// A signing call captured by the gate.
pub struct PendingRequest {
    pub request: RequestParams,
    pub context: ExecutionContext,
    pub events: Arc<dyn EventEmitter>,
    pub done: Done,
}

impl PendingRequest {
    /// Complete the request with an error, leaving it untouched.
    pub fn reject(self, err: Error) {
        (self.done)(self.request, Err(err))
    }
}

impl Debug for PendingRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRequest")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

/// What the caller of [`CredentialGate::admit`] must do next.
#[derive(Debug)]
pub enum Admission {
    /// Credentials are resolved, sign right away.
    Ready(Arc<SigningMaterial>, PendingRequest),
    /// The gate keeps the request and replays it once resolved.
    Held,
    /// The request can't be signed, complete it with the error.
    Rejected(PendingRequest, Error),
}

enum GateState {
    Pending(VecDeque<PendingRequest>),
    /// Held requests are being replayed. Arrivals queue up behind them.
    Replaying(VecDeque<PendingRequest>),
    Resolved(Arc<SigningMaterial>),
    Failed(String),
}

/// One-shot gate between the credential fetch and the signing calls.
///
/// The gate starts `Pending` and moves exactly once to either `Resolved` or
/// `Failed`. The lock is never held while a request is signed or completed,
/// so a completion callback may call back into the plugin.
pub struct CredentialGate {
    policy: PendingPolicy,
    state: Mutex<GateState>,
}

impl CredentialGate {
    pub fn new(policy: PendingPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(GateState::Pending(VecDeque::new())),
        }
    }

    fn state(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decide what happens to a signing call.
    pub fn admit(&self, req: PendingRequest) -> Admission {
        let mut state = self.state();
        match &mut *state {
            GateState::Resolved(material) => Admission::Ready(material.clone(), req),
            GateState::Replaying(queue) => {
                queue.push_back(req);
                Admission::Held
            }
            GateState::Pending(queue) => {
                if self.policy == PendingPolicy::Single && !queue.is_empty() {
                    return Admission::Rejected(
                        req,
                        Error::pending_slot_occupied(
                            "another request is already waiting for credentials",
                        ),
                    );
                }
                queue.push_back(req);
                debug!("credentials pending, holding request ({} held)", queue.len());
                Admission::Held
            }
            GateState::Failed(message) => {
                Admission::Rejected(req, Error::credential_fetch(message.clone()))
            }
        }
    }

    /// Move to `Resolved`, replaying every held request through `replay` in
    /// arrival order before any later request gets signed.
    pub fn resolve(
        &self,
        material: SigningMaterial,
        mut replay: impl FnMut(PendingRequest, &Arc<SigningMaterial>),
    ) {
        let material = Arc::new(material);

        let mut batch = {
            let mut state = self.state();
            match std::mem::replace(&mut *state, GateState::Replaying(VecDeque::new())) {
                GateState::Pending(queue) => queue,
                other => {
                    *state = other;
                    debug!("credential gate already settled, ignoring resolution");
                    return;
                }
            }
        };

        loop {
            for req in batch.drain(..) {
                replay(req, &material);
            }

            let mut state = self.state();
            if let GateState::Replaying(queue) = &mut *state {
                if !queue.is_empty() {
                    batch = std::mem::take(queue);
                    continue;
                }
            }
            *state = GateState::Resolved(material.clone());
            return;
        }
    }

    /// Move to `Failed`, rejecting every held request.
    pub fn fail(&self, err: &Error) {
        let message = format!(
            "{SDK_CONFIG_INVALID} credentials fetch error. Ensure the credential chain can obtain valid credentials. Error: {err}"
        );

        let held = {
            let mut state = self.state();
            match std::mem::replace(&mut *state, GateState::Failed(message.clone())) {
                GateState::Pending(queue) => queue,
                other => {
                    *state = other;
                    debug!("credential gate already settled, ignoring failure");
                    return;
                }
            }
        };

        error!("{message}");
        for req in held {
            req.reject(Error::credential_fetch(message.clone()));
        }
    }

    /// Number of requests waiting for the gate to settle.
    pub fn held(&self) -> usize {
        match &*self.state() {
            GateState::Pending(queue) | GateState::Replaying(queue) => queue.len(),
            GateState::Resolved(_) | GateState::Failed(_) => 0,
        }
    }
}

impl Debug for CredentialGate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let state = match &*self.state() {
            GateState::Pending(_) => "pending",
            GateState::Replaying(_) => "replaying",
            GateState::Resolved(_) => "resolved",
            GateState::Failed(_) => "failed",
        };
        f.debug_struct("CredentialGate")
            .field("policy", &self.policy)
            .field("state", &state)
            .finish()
    }
}
