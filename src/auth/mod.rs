//! Phone verification via one-time passcodes.

pub mod code;
pub mod verifier;

pub use code::generate_code;
pub use verifier::PhoneVerifier;
