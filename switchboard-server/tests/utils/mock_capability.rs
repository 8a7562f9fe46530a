use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use switchboard_client::{
    Capability, CapabilityError, CapabilityFactory, CandidateCallback, ConnectivityCallback,
};
use switchboard_core::{Descriptor, IceCandidate, UserId};

/// Media engine stand-in that only counts applied descriptors.
#[derive(Default)]
pub struct CountingCapability {
    local_applied: AtomicUsize,
    remote_applied: AtomicUsize,
}

#[async_trait]
impl Capability for CountingCapability {
    async fn generate_offer(&self) -> Result<Descriptor, CapabilityError> {
        Ok(Descriptor::offer("v=0 offer"))
    }

    async fn generate_answer(&self) -> Result<Descriptor, CapabilityError> {
        Ok(Descriptor::answer("v=0 answer"))
    }

    async fn apply_local_descriptor(&self, _: &Descriptor) -> Result<(), CapabilityError> {
        self.local_applied.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn apply_remote_descriptor(&self, _: &Descriptor) -> Result<(), CapabilityError> {
        self.remote_applied.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn add_candidate(&self, _: Option<&IceCandidate>) -> Result<(), CapabilityError> {
        Ok(())
    }

    fn on_candidate_discovered(&self, _: CandidateCallback) {}

    fn on_connectivity_state_changed(&self, _: ConnectivityCallback) {}

    async fn restart_connectivity(&self) -> Result<(), CapabilityError> {
        Ok(())
    }

    async fn teardown(&self) {}
}

/// Hands out one [`CountingCapability`] per remote and keeps it for
/// inspection.
#[derive(Default)]
pub struct CountingFactory {
    created: DashMap<UserId, Arc<CountingCapability>>,
}

impl CountingFactory {
    /// `(local, remote)` descriptors applied in the session with `remote`.
    pub fn applied(&self, remote: &UserId) -> (usize, usize) {
        self.created
            .get(remote)
            .map(|c| {
                (
                    c.local_applied.load(Ordering::SeqCst),
                    c.remote_applied.load(Ordering::SeqCst),
                )
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl CapabilityFactory for CountingFactory {
    async fn create(&self, remote: &UserId) -> Result<Arc<dyn Capability>, CapabilityError> {
        let capability = Arc::new(CountingCapability::default());
        self.created.insert(remote.clone(), capability.clone());
        Ok(capability)
    }
}
