//! Price evaluation — estimates print time from the artifact and prices it.
//!
//! A stand-in for a real slicer run: print time scales with artifact size
//! and the selected process, and the price is time × copies × rate with a
//! material surcharge. Good enough for quoting; not a non-goal violation
//! because the evaluation must produce *some* deterministic price.

use platen_core::order::{Material, Process};

/// Estimated printing parameters for one copy of the artifact.
#[derive(Debug, Clone, Copy)]
pub struct PrintEstimate {
    pub time_minutes: f64,
}

const MINUTES_PER_KIB: f64 = 0.12;

/// Derive a print-time estimate from the received artifact.
pub fn estimate(artifact_bytes: u64, process: Process) -> PrintEstimate {
    let factor = match process {
        Process::Standard => 1.0,
        Process::Precise => 1.6,
        Process::ThickLayer => 0.7,
        Process::FullFill => 2.0,
    };
    PrintEstimate {
        time_minutes: (artifact_bytes as f64 / 1024.0) * MINUTES_PER_KIB * factor,
    }
}

fn material_factor(material: Material) -> f64 {
    match material {
        Material::PLA => 1.0,
        Material::PET => 1.2,
        Material::ASA => 1.4,
    }
}

/// Final quote: estimated minutes × copies × per-minute rate × material
/// surcharge.
pub fn calculate_price(
    estimate: &PrintEstimate,
    copies: u32,
    material: Material,
    rate_per_minute: f64,
) -> f64 {
    estimate.time_minutes * copies as f64 * rate_per_minute * material_factor(material)
}
