//! sideline agent
//!
//! Segmented sports recording on top of a camera capability, and an
//! offline-tolerant sync layer that tracks every finished clip against a
//! remote object store.

pub mod capture;
pub mod config;
pub mod data;
pub mod logging;
pub mod net;
pub mod sync;
pub mod ui;
pub mod upload;

#[cfg(test)]
mod test_support;
