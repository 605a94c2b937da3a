//! Destination workflows
//!
//! Each workflow is a strictly sequential chain of awaited calls against the
//! routing service and the registry.

pub mod deletion;
pub mod registration;
pub mod verification;

pub use deletion::DestinationRemover;
pub use registration::{RegisterDestination, Registrar};
pub use verification::{VerificationResult, WebhookVerifier};
