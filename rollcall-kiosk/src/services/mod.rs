//! External collaborators consumed by the kiosk
//!
//! The realtime store and the face-verification service are capabilities
//! injected at construction; nothing here is a module-scoped singleton.

pub mod face_client;
pub mod firebase;
pub mod memory;
pub mod store;

pub use face_client::{
    spawn_status_monitor, FaceVerificationClient, FaceVerifier, RegistrationOutcome, TimeoutPolicy,
    VerificationOutcome,
};
pub use firebase::FirebaseStore;
pub use memory::MemoryStore;
pub use store::{AttendanceStore, StoreError, StoreSignal};
