// @generated
// This file is @generated by prost-build.
/// Geographic position in decimal degrees.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Location {
    #[prost(double, tag = "1")]
    pub latitude: f64,
    #[prost(double, tag = "2")]
    pub longitude: f64,
}
/// A named sensor with a fixed position and free-form tags.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Sensor {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    pub location: ::core::option::Option<Location>,
    #[prost(string, repeated, tag = "3")]
    pub tags: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}
/// A single measurement reported by a sensor. The server assigns `time`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SensorReading {
    #[prost(string, tag = "1")]
    pub sensor_name: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    pub time: ::core::option::Option<::prost_types::Timestamp>,
    #[prost(double, tag = "3")]
    pub value: f64,
}
/// Inclusive time window over one sensor's readings.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TimeRangeQuery {
    #[prost(string, tag = "1")]
    pub sensor_name: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    pub start_time: ::core::option::Option<::prost_types::Timestamp>,
    #[prost(message, optional, tag = "3")]
    pub end_time: ::core::option::Option<::prost_types::Timestamp>,
}
#[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
pub struct GetSensorRequest {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
}
#[derive(Clone, Copy, PartialEq, Eq, Hash, ::prost::Message)]
pub struct UpdateSensorResponse {
    #[prost(int64, tag = "1")]
    pub rows_affected: i64,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SensorReadingsResponse {
    #[prost(message, repeated, tag = "1")]
    pub sensor_readings: ::prost::alloc::vec::Vec<SensorReading>,
}
include!("sensorsphere.v1.tonic.rs");
// @@protoc_insertion_point(module)
