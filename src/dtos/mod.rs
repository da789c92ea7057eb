pub mod managementdtos;
pub mod propertydtos;
pub mod unlockdtos;
