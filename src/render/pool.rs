use crate::render::Renderer;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Capacity-limited access to a shared renderer
///
/// Rendering-engine instances are expensive, so every fetch across every Job
/// goes through this pool. The pool hands out at most `capacity` leases at a
/// time; a lease returns its slot when dropped, on every exit path.
#[derive(Clone)]
pub struct RendererPool {
    renderer: Arc<dyn Renderer>,
    semaphore: Arc<Semaphore>,
}

/// A leased renderer; the slot is released when this is dropped
pub struct PooledRenderer {
    renderer: Arc<dyn Renderer>,

    /// The semaphore permit for this lease
    _permit: OwnedSemaphorePermit,
}

impl RendererPool {
    /// Creates a pool allowing `capacity` concurrent renders (minimum 1)
    pub fn new(renderer: Arc<dyn Renderer>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            renderer,
            semaphore: Arc::new(Semaphore::new(capacity)),
        }
    }

    /// Waits for a free slot and leases the renderer
    ///
    /// Returns None only if the pool has been closed.
    pub async fn acquire(&self) -> Option<PooledRenderer> {
        let permit = self.semaphore.clone().acquire_owned().await.ok()?;
        Some(PooledRenderer {
            renderer: self.renderer.clone(),
            _permit: permit,
        })
    }

    /// Number of slots currently free
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl std::ops::Deref for PooledRenderer {
    type Target = dyn Renderer;

    fn deref(&self) -> &Self::Target {
        self.renderer.as_ref()
    }
}
