// [apps/reco-driver/src/config.rs]
//! The run's calibration configuration: one JSON document, read from the
//! path given by `--params`, that bundles every detector's setup
//! parameters. Each nested type reuses the very struct its detector crate
//! already deserializes into, so there is no parallel "config spec"
//! hierarchy to keep in sync.

use reco_core_math::{GlobalTransform, SysCorrectionTable};
use reco_domain_detectors::bmon::DiamondParams;
use reco_domain_detectors::sts::StsModuleConfig;
use reco_domain_detectors::trd1d::Trd1DPadGeometry;
use reco_domain_detectors::trd2d::TrdPadGeometry;
use reco_domain_model::ModuleParams;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::DriverError;

/// STS setup: one [`StsModuleConfig`] per module plus the channel count
/// shared by every module's front/back sensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StsSetupParams {
    /// Channels per side, shared by every configured module.
    pub n_channels_per_side: usize,
    /// Per-module configuration, in module-index order.
    pub modules: Vec<StsModuleConfig>,
}

/// TOF setup: one [`ModuleParams`] per RPC plus its `(super_module, rpc)` address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TofSetupParams {
    /// Per-RPC calibration/geometry, in RPC-index order.
    pub modules: Vec<ModuleParams>,
    /// `(super_module, rpc)` address of each entry in `modules`, same order.
    pub addresses: Vec<(u16, u16)>,
}

/// BMon setup: the diamonds and the address selection mask.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BMonSetupParams {
    /// Diamond parameter blocks.
    pub diamonds: Vec<DiamondParams>,
    /// Selection mask applied to a digi's address to find its diamond.
    pub selection_mask: u64,
}

/// One TRD-1D module's geometry and retention window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trd1DModuleParams {
    /// Module index this entry configures, matching `DetectorAddress::module()`.
    pub module_index: u16,
    /// Number of pad rows in this module.
    pub n_rows: usize,
    /// Pad geometry.
    pub geometry: Trd1DPadGeometry,
    /// Module-to-global transform.
    pub transform: GlobalTransform,
    /// Cluster retention window before a row-pair sweep forces closure.
    pub keep_window: u32,
}

/// One TRD-2D module's geometry and retention window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trd2DModuleParams {
    /// Module index this entry configures, matching `DetectorAddress::module()`.
    pub module_index: u16,
    /// Number of pad rows in this module.
    pub n_rows: usize,
    /// Pad geometry.
    pub geometry: TrdPadGeometry,
    /// Module-to-global transform.
    pub transform: GlobalTransform,
    /// Cluster retention window before a row sweep forces closure.
    pub keep_window: u32,
    /// SYS position-bias correction table, indexed by `|dx|` (§4.5).
    /// Defaults to a neutral table for modules without their own SYS
    /// calibration.
    #[serde(default = "SysCorrectionTable::identity")]
    pub sys_correction: SysCorrectionTable,
}

/// The full calibration configuration for one run, covering every
/// subsystem. Deserialized whole from the `--params` JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunParameters {
    /// STS setup.
    pub sts: StsSetupParams,
    /// TOF setup.
    pub tof: TofSetupParams,
    /// BMon setup.
    pub bmon: BMonSetupParams,
    /// TRD-1D modules, each naming its own `module_index`.
    #[serde(default)]
    pub trd1d: Vec<Trd1DModuleParams>,
    /// TRD-2D modules, each naming its own `module_index`.
    #[serde(default)]
    pub trd2d: Vec<Trd2DModuleParams>,
}

impl RunParameters {
    /// Reads and parses the calibration parameter block at `path`.
    ///
    /// # Errors
    /// Returns [`DriverError::ParamsParse`] if the file cannot be read or
    /// does not parse as the expected JSON shape.
    pub fn load(path: &Path) -> Result<Self, DriverError> {
        let raise = |source: serde_json::Error| DriverError::ParamsParse { path: path.display().to_string(), source };
        let text = std::fs::read_to_string(path).map_err(|io_err| DriverError::ParamsParse {
            path: path.display().to_string(),
            source: serde::de::Error::custom(io_err.to_string()),
        })?;
        serde_json::from_str(&text).map_err(raise)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_minimal_document_round_trips_through_json() {
        let params = RunParameters {
            sts: StsSetupParams { n_channels_per_side: 1024, modules: Vec::new() },
            tof: TofSetupParams { modules: Vec::new(), addresses: Vec::new() },
            bmon: BMonSetupParams { diamonds: Vec::new(), selection_mask: 0 },
            trd1d: Vec::new(),
            trd2d: Vec::new(),
        };
        let json = serde_json::to_string(&params).unwrap();
        let parsed: RunParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.sts.n_channels_per_side, 1024);
    }

    #[test]
    fn missing_trd_sections_default_to_empty() {
        let json = r#"{"sts":{"n_channels_per_side":1,"modules":[]},"tof":{"modules":[],"addresses":[]},"bmon":{"diamonds":[],"selection_mask":0}}"#;
        let parsed: RunParameters = serde_json::from_str(json).unwrap();
        assert!(parsed.trd1d.is_empty());
        assert!(parsed.trd2d.is_empty());
    }
}
