pub mod managementmodel;
pub mod propertymodel;
pub mod unlockmodel;
pub mod usermodel;
