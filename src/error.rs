// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/homesim

//! Error types for the simulation core
//!
//! Every error here is local and recoverable: the engine logs it and keeps
//! its previous state. Nothing in this enum is allowed to halt the tick loop.

use thiserror::Error;

/// Errors raised by the simulation core
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// Positional record with the wrong number of fields
    #[error("malformed {record} record: expected {expected} fields, found {found}")]
    MalformedRecord {
        record: &'static str,
        expected: usize,
        found: usize,
    },

    /// A field that could not be parsed
    #[error("invalid {field} in {record} record: {value:?}")]
    InvalidField {
        record: &'static str,
        field: &'static str,
        value: String,
    },

    /// Unrecognised sensor or device kind
    #[error("unknown kind: {kind}")]
    UnknownKind { kind: String },

    /// A layout element references a point that does not exist
    #[error("unknown point: {name}")]
    UnknownPoint { name: String },

    /// A power meter is bound to a device that is not present
    #[error("sensor {sensor} references unknown device {device}")]
    UnknownDevice { sensor: String, device: String },

    /// No device with this id
    #[error("no device with id {id}")]
    NoSuchDevice { id: String },

    /// Unparseable "HH:MM" time
    #[error("invalid simulated time {value:?}, expected HH:MM")]
    InvalidTime { value: String },

    /// Simulation cannot start without sensors
    #[error("no sensors configured, simulation cannot start")]
    NoSensors,

    /// Operation requires a running simulation
    #[error("simulation is not running")]
    NotRunning,

    /// Door index out of range
    #[error("no door at index {index}")]
    UnknownDoor { index: usize },
}

/// Result alias for the simulation core
pub type Result<T> = std::result::Result<T, SimError>;
