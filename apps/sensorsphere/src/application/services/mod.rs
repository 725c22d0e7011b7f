//! Application Services

mod sensor_service;

pub use sensor_service::{MISSING_FIELDS, STATUS_MESSAGE, SensorService, ServiceError};
