//! Signal-to-noise analysis of genome-wide association results and
//! two-group DNA methylation comparisons.
//!
//! The association side smooths a per-predictor signal (moving average or
//! Savitzky-Golay), estimates how much a gene stands out from its background
//! and bootstraps confidence intervals over a grid of smoothing settings.
//! The methylation side compares CpG beta values between two groups with a
//! Welch t-test (Benjamini-Hochberg corrected) or a JZS Bayes factor.

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod error;
pub mod io;
pub mod layout;
pub mod metadata;
pub mod methylation;
pub mod observation;
pub mod progress;
pub mod smoothing;
pub mod snr;
pub mod stats;
pub mod sweep;

pub use error::{AnalysisError, Result};
