// SPDX-License-Identifier: Apache-2.0

//! Mapper configuration.

use serde::{Deserialize, Serialize};

/// Largest LUT size the mapper accepts.
pub const MAX_LUT_SIZE: usize = 12;

/// Largest number of cuts kept per node.
pub const MAX_CUTS: usize = 16;

/// How (and whether) cut functions are tracked during enumeration.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum FunctionMode {
    /// Leaves only; functions are recovered from the graph after mapping.
    #[default]
    Structural,
    /// Every cut carries an interned truth table.
    Truth,
    /// Truth tables plus a disjoint-support decomposition check; cuts whose
    /// function has a prime block are rejected and area is counted in
    /// two-input gates.
    Dsd,
}

impl FunctionMode {
    pub fn tracks_functions(self) -> bool {
        !matches!(self, FunctionMode::Structural)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapParams {
    /// K, the number of LUT inputs.
    pub lut_size: usize,
    /// N, the number of cuts kept per node (including the trivial cut).
    pub num_cuts: usize,
    pub functions: FunctionMode,
    /// Drop leaves the cut function does not depend on. Always on in
    /// `FunctionMode::Dsd`.
    pub cut_min: bool,
    /// Stop after the two delay rounds.
    pub delay_only: bool,
    /// Target delay in library delay units; the global required time is never
    /// tighter than this.
    pub delay_target: Option<f64>,
    /// Abandon a node's enumeration once a full store cannot be beaten on the
    /// primary cost.
    pub early_stop: bool,
    /// Keep every node's cut list alive after its last structural reference.
    pub keep_cuts: bool,
}

impl Default for MapParams {
    fn default() -> Self {
        MapParams {
            lut_size: 6,
            num_cuts: 8,
            functions: FunctionMode::Structural,
            cut_min: false,
            delay_only: false,
            delay_target: None,
            early_stop: false,
            keep_cuts: false,
        }
    }
}

impl MapParams {
    pub fn with_lut_size(lut_size: usize) -> Self {
        MapParams {
            lut_size,
            ..Default::default()
        }
    }

    /// Whether support minimization runs on each merged cut.
    pub fn minimizes_support(&self) -> bool {
        self.functions == FunctionMode::Dsd || (self.cut_min && self.functions.tracks_functions())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_roundtrip_through_json() {
        let params = MapParams::default();
        let json = serde_json::to_string(&params).unwrap();
        let back: MapParams = serde_json::from_str(&json).unwrap();
        assert_eq!(params, back);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let params: MapParams =
            serde_json::from_str(r#"{"lut_size": 4, "functions": "dsd"}"#).unwrap();
        assert_eq!(params.lut_size, 4);
        assert_eq!(params.num_cuts, 8);
        assert_eq!(params.functions, FunctionMode::Dsd);
        assert!(params.minimizes_support());
    }

    #[test]
    fn test_cut_min_needs_functions() {
        let mut params = MapParams::default();
        params.cut_min = true;
        assert!(!params.minimizes_support());
        params.functions = FunctionMode::Truth;
        assert!(params.minimizes_support());
    }
}
