//! Component D of the analysis pipeline: the Spring, Automatic Rally,
//! Secondary Test, Sign of Strength, and Last Point of Support detectors,
//! plus asset-class-aware confidence scoring.

pub mod automatic_rally;
pub mod error;
pub mod lps;
pub mod sc;
pub mod scoring;
pub mod secondary_test;
pub mod sos;
pub mod spring;

pub use automatic_rally::detect_automatic_rally;
pub use error::PatternsError;
pub use lps::detect_last_point_of_support;
pub use sc::detect_selling_climax;
pub use secondary_test::detect_secondary_test;
pub use sos::detect_sign_of_strength;
pub use spring::{detect_spring, SpringOutcome};
