pub mod access_gate;
pub mod error;
pub mod filter_compiler;
pub mod management_service;
pub mod payment_provider;
pub mod unlock_service;
