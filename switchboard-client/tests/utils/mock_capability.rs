use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use switchboard_client::{
    Capability, CapabilityError, CandidateCallback, ConnectivityCallback, ConnectivityState,
};
use switchboard_core::{Descriptor, IceCandidate};

#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityCall {
    GenerateOffer,
    GenerateAnswer,
    ApplyLocal(Descriptor),
    ApplyRemote(Descriptor),
    AddCandidate(Option<IceCandidate>),
    RestartConnectivity,
    Teardown,
}

/// Capability that records every call and lets the test play the media
/// engine's side (discovered candidates, connectivity changes).
pub struct MockCapability {
    name: String,
    calls: Mutex<Vec<CapabilityCall>>,
    candidate_cb: Mutex<Option<CandidateCallback>>,
    connectivity_cb: Mutex<Option<ConnectivityCallback>>,
    descriptors: AtomicU32,
    hang_offers: AtomicBool,
    fail_answers: AtomicBool,
}

impl MockCapability {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            calls: Mutex::new(Vec::new()),
            candidate_cb: Mutex::new(None),
            connectivity_cb: Mutex::new(None),
            descriptors: AtomicU32::new(0),
            hang_offers: AtomicBool::new(false),
            fail_answers: AtomicBool::new(false),
        }
    }

    /// Makes `generate_offer` never complete.
    pub fn hang_offers(&self) {
        self.hang_offers.store(true, Ordering::SeqCst);
    }

    /// Makes `generate_answer` fail.
    pub fn fail_answers(&self) {
        self.fail_answers.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<CapabilityCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn count(&self, pred: impl Fn(&CapabilityCall) -> bool) -> usize {
        self.calls.lock().expect("calls lock").iter().filter(|c| pred(c)).count()
    }

    /// Remote candidates handed to the capability, in order.
    pub fn added_candidates(&self) -> Vec<Option<IceCandidate>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                CapabilityCall::AddCandidate(candidate) => Some(candidate),
                _ => None,
            })
            .collect()
    }

    pub fn emit_candidate(&self, candidate: Option<IceCandidate>) {
        if let Some(cb) = self.candidate_cb.lock().expect("cb lock").as_ref() {
            cb(candidate);
        }
    }

    pub fn emit_connectivity(&self, state: ConnectivityState) {
        if let Some(cb) = self.connectivity_cb.lock().expect("cb lock").as_ref() {
            cb(state);
        }
    }

    fn record(&self, call: CapabilityCall) {
        tracing::debug!("[MockCapability {}] {:?}", self.name, call);
        self.calls.lock().expect("calls lock").push(call);
    }

    fn next_sdp(&self, kind: &str) -> String {
        let n = self.descriptors.fetch_add(1, Ordering::SeqCst);
        format!("v=0 {}-{}-{}", kind, self.name, n)
    }
}

#[async_trait]
impl Capability for MockCapability {
    async fn generate_offer(&self) -> Result<Descriptor, CapabilityError> {
        self.record(CapabilityCall::GenerateOffer);
        if self.hang_offers.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(Descriptor::offer(self.next_sdp("offer")))
    }

    async fn generate_answer(&self) -> Result<Descriptor, CapabilityError> {
        self.record(CapabilityCall::GenerateAnswer);
        if self.fail_answers.load(Ordering::SeqCst) {
            return Err(CapabilityError::operation("create answer", "no codecs in common"));
        }
        Ok(Descriptor::answer(self.next_sdp("answer")))
    }

    async fn apply_local_descriptor(&self, descriptor: &Descriptor) -> Result<(), CapabilityError> {
        self.record(CapabilityCall::ApplyLocal(descriptor.clone()));
        Ok(())
    }

    async fn apply_remote_descriptor(&self, descriptor: &Descriptor) -> Result<(), CapabilityError> {
        self.record(CapabilityCall::ApplyRemote(descriptor.clone()));
        Ok(())
    }

    async fn add_candidate(&self, candidate: Option<&IceCandidate>) -> Result<(), CapabilityError> {
        self.record(CapabilityCall::AddCandidate(candidate.cloned()));
        match candidate {
            Some(c) if c.candidate.contains("stale") => {
                Err(CapabilityError::StaleCandidate(c.candidate.clone()))
            }
            _ => Ok(()),
        }
    }

    fn on_candidate_discovered(&self, callback: CandidateCallback) {
        *self.candidate_cb.lock().expect("cb lock") = Some(callback);
    }

    fn on_connectivity_state_changed(&self, callback: ConnectivityCallback) {
        *self.connectivity_cb.lock().expect("cb lock") = Some(callback);
    }

    async fn restart_connectivity(&self) -> Result<(), CapabilityError> {
        self.record(CapabilityCall::RestartConnectivity);
        Ok(())
    }

    async fn teardown(&self) {
        self.record(CapabilityCall::Teardown);
    }
}
