//! Application Layer - Use cases and port definitions.
//!
//! The sensor service implements the seven domain operations once; the HTTP
//! and gRPC bindings in the infrastructure layer both dispatch into it.

/// Port interfaces for storage and authorization collaborators.
pub mod ports;

/// Domain operations and their input validation.
pub mod services;
