pub mod db;
pub mod managementdb;
pub mod propertydb;
pub mod subscriptiondb;
pub mod unlockdb;

#[cfg(test)]
pub mod memory;
