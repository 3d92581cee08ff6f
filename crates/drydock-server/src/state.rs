use std::sync::Arc;

use drydock_docker::ContainerRuntime;

use crate::lock::ServiceLocks;
use crate::store::DescriptorStore;

/// Shared across handlers; built once at startup.
pub struct AppState<R> {
    pub store: Arc<DescriptorStore>,
    pub runtime: Arc<R>,
    pub locks: Arc<ServiceLocks>,
}

impl<R: ContainerRuntime> AppState<R> {
    pub fn new(store: DescriptorStore, runtime: R) -> Self {
        Self {
            store: Arc::new(store),
            runtime: Arc::new(runtime),
            locks: Arc::new(ServiceLocks::default()),
        }
    }
}

// Derived Clone would require `R: Clone`.
impl<R> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            runtime: Arc::clone(&self.runtime),
            locks: Arc::clone(&self.locks),
        }
    }
}
