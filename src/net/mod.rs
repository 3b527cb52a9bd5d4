//! Network layer subsystem.
//!
//! Plain TCP is handed straight to Axum; `tls.rs` prepares the rustls
//! acceptor when `listener.tls` is configured.

pub mod tls;
