use std::fmt;

/// Lifecycle state of a managed object.
///
/// Transitions are driven by producer requests (any thread) and by
/// `Renderer::process_queues` (render thread only):
///
/// ```text
/// Constructed ─▶ InitQueued ─▶ Initialized ⇄ UpdateQueued
///                    │              │              │
///                    └──────────────┴──────────────┴─▶ ReleaseQueued ─▶ Released
/// ```
///
/// `Failed` is entered when `device_init` reports an error. A failed object has
/// no native value and is skipped by draw code.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ObjectState {
    /// Allocated, not yet queued. Only exists inside the factory call.
    Constructed,
    /// Waiting for `device_init`.
    InitQueued,
    /// Native value exists and reflects the last drained CPU-side state.
    Initialized,
    /// Native value exists; a `device_update` is pending.
    UpdateQueued,
    /// Waiting for `device_release`. No further requests are honored.
    ReleaseQueued,
    /// Terminal. The object has been deallocated.
    Released,
    /// `device_init` failed; no native value exists.
    Failed,
}

impl ObjectState {
    /// Returns the queue stage this state is waiting in, if any.
    pub fn queued_stage(self) -> Option<Stage> {
        match self {
            Self::InitQueued => Some(Stage::Init),
            Self::UpdateQueued => Some(Stage::Update),
            Self::ReleaseQueued => Some(Stage::Release),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Constructed => "constructed",
            Self::InitQueued => "init-queued",
            Self::Initialized => "initialized",
            Self::UpdateQueued => "update-queued",
            Self::ReleaseQueued => "release-queued",
            Self::Released => "released",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One of the three queue stages, in drain order.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Stage {
    Init,
    Update,
    Release,
}

impl Stage {
    pub const DRAIN_ORDER: [Stage; 3] = [Stage::Init, Stage::Update, Stage::Release];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Update => "update",
            Self::Release => "release",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
