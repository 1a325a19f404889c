//! # IO Module
//!
//! Interfaces that expose the backend to clients. Only the REST API exists
//! today; it owns every translation between the wire vocabulary (legacy or
//! modern field names and enum tokens) and the canonical DTOs the domain
//! services work with.

pub mod rest;
