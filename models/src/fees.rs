// models/src/fees.rs
//! Consultation fee policy.
//!
//! A doctor's fee is not a free-form input: it is derived from the
//! specialization every time one is supplied, and any fee sent by the caller
//! is overwritten.

use serde::{Deserialize, Serialize};

const STANDARD_SPECIALIZATIONS: &[&str] = &[
    "general practitioner",
    "general physician",
    "family medicine",
    "pediatrics",
];

const SURGICAL_SPECIALIZATIONS: &[&str] = &["cardiac surgery", "neurosurgery", "oncology"];

/// The three fee tiers a specialization can fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeTier {
    /// General, family and pediatric care.
    Standard,
    /// Orthopedics, cardiology, neurology, dermatology, dentistry and
    /// anything not listed elsewhere.
    Specialist,
    /// Cardiac surgery, neurosurgery and oncology.
    Surgical,
}

impl FeeTier {
    /// Looks a specialization up case-insensitively.
    pub fn for_specialization(specialization: &str) -> Self {
        let key = specialization.trim().to_lowercase();
        if STANDARD_SPECIALIZATIONS.contains(&key.as_str()) {
            FeeTier::Standard
        } else if SURGICAL_SPECIALIZATIONS.contains(&key.as_str()) {
            FeeTier::Surgical
        } else {
            FeeTier::Specialist
        }
    }

    /// Consultation fee for the tier.
    pub fn fee(&self) -> u32 {
        match self {
            FeeTier::Standard => 2000,
            FeeTier::Specialist => 3000,
            FeeTier::Surgical => 4000,
        }
    }
}

/// Derives the consultation fee for a specialization.
pub fn fee_for_specialization(specialization: &str) -> u32 {
    FeeTier::for_specialization(specialization).fee()
}
