//! Typed client for the db-gateway HTTP API.

pub mod client;

pub use client::{GatewayClient, InsertedMany, InsertedOne, SdkError};
