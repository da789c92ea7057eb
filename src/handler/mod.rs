pub mod owner;
pub mod properties;
pub mod unlock;
pub mod webhook;
