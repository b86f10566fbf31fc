//! # Application Module
//!
//! Manager implementations behind the inbound ports.

pub mod batch_resend_manager;
pub mod legacy_resend_manager;
pub mod resend_manager;

pub use batch_resend_manager::BatchResendManagerImpl;
pub use legacy_resend_manager::LegacyResendManagerImpl;
pub use resend_manager::ResendManagerImpl;
