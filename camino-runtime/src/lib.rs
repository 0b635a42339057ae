pub mod chequebook;
pub mod executor;
pub mod fx;
pub mod keychain;
pub mod lock_planner;
pub mod unlock_planner;
pub mod verifier;

// Re-export the main types for convenience
pub use chequebook::{apply_cheque, paid_out_after, verify_cheque};
pub use executor::{ExecutionConfig, Executor};
pub use fx::{is_authorized, owners_satisfied, Fx, Secp256k1Fx};
pub use keychain::{address_of, sign_recoverable, Keychain};
pub use lock_planner::{lock, LockRequest, SpendPlan};
pub use unlock_planner::unlock;
pub use verifier::TransitionVerifier;
