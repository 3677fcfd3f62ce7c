//! End-to-End Integration Tests
//!
//! These tests drive complete authorization transactions through the grant
//! service with the OpenID Connect decisions installed, backed by in-memory
//! collaborators.

mod common;
mod authorization_flows;
mod consent_round_trip;
