//! Granular-flow simulation driver.
//!
//! This crate implements the orchestration layer of a granular settling
//! and discharge simulation: parameter loading, layered particle fill
//! planning, boundary-condition lifecycle, mesh-soup motion, the
//! fixed-step advance loop, and periodic snapshot output. The contact
//! solver itself sits behind the [`engine::GranularEngine`] trait; the
//! bundled [`engine::KinematicEngine`] is a minimal CPU backend so the
//! scenarios and tests run headless.

pub mod boundary;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod mesh;
pub mod output;
pub mod sampling;
pub mod scenarios;

pub use error::{Error, Result};
