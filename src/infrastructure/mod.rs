//! Infrastructure layer - cache stores, source of record, services and plumbing

pub mod auth;
pub mod cache;
pub mod logging;
pub mod observability;
pub mod services;
pub mod storage;
