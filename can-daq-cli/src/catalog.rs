//! Input loading: signal catalog, default protocol parameters and selection file

use anyhow::{Context, Result};
use can_daq_compiler::{DaqError, Measurement, Protocol, ProtocolParams, Selection};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Catalog extracted from the ECU's A2L description
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogFile {
    pub protocol: Protocol,
    /// Protocol parameters, if the A2L contained a CCP/XCP section
    #[serde(default)]
    pub params: Option<ProtocolParams>,
    #[serde(default)]
    pub measurements: Vec<Measurement>,
}

/// Load a catalog JSON file
pub fn load_catalog(path: &Path) -> Result<CatalogFile> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog file: {:?}", path))?;
    let catalog: CatalogFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse catalog file: {:?}", path))?;

    log::info!(
        "Loaded {} catalog with {} measurements from {:?}",
        catalog.protocol,
        catalog.measurements.len(),
        path
    );
    Ok(catalog)
}

/// Load a protocol parameter JSON file
pub fn load_params(path: &Path) -> Result<ProtocolParams> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read default params file: {:?}", path))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse default params file: {:?}", path))
}

/// Pick the catalog's parameters, else the default parameter file
pub fn resolve_params(
    catalog: &CatalogFile,
    default_params: Option<&Path>,
) -> Result<ProtocolParams> {
    if let Some(params) = &catalog.params {
        return Ok(params.clone());
    }
    match default_params {
        Some(path) => {
            log::info!("Catalog has no {} parameters, using {:?}", catalog.protocol, path);
            load_params(path)
        }
        None => Err(DaqError::ProtocolMismatch(format!(
            "catalog contains no {} parameters and no default params file was given",
            catalog.protocol
        ))
        .into()),
    }
}

/// Load the user's `name;event` selection file
pub fn load_selection(path: &Path) -> Result<Selection> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Signal file not found: {:?}", path))?;
    let selection = Selection::parse(&content);
    log::info!("Loaded {} requested signals from {:?}", selection.len(), path);
    Ok(selection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use can_daq_compiler::CanId;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CATALOG: &str = r#"{
        "protocol": "xcp",
        "params": {
            "can_id_master": "0x7E0",
            "can_id_slave": "0x7E1",
            "max_cto": "0x08",
            "max_dto": "0x0008"
        },
        "measurements": [
            { "name": "EngineSpeed", "datatype": "UWORD", "ecu_address": "0x40001000",
              "conversion": { "type": "LINEAR", "a": 0.25, "b": 0.0 }, "unit": "rpm" },
            { "name": "Temps", "datatype": "SBYTE", "ecu_address": 4096, "matrix_dim": 4 }
        ]
    }"#;

    fn temp_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_catalog() {
        let file = temp_file(CATALOG);
        let catalog = load_catalog(file.path()).unwrap();

        assert_eq!(catalog.protocol, Protocol::Xcp);
        assert_eq!(catalog.measurements.len(), 2);
        assert_eq!(catalog.measurements[0].ecu_address, Some(0x4000_1000));
        assert_eq!(catalog.measurements[1].matrix_dim, 4);

        let params = resolve_params(&catalog, None).unwrap();
        assert_eq!(params.can_id_master, CanId::standard(0x7E0));
    }

    #[test]
    fn test_default_params_fallback() {
        let catalog: CatalogFile =
            serde_json::from_str(r#"{ "protocol": "ccp", "measurements": [] }"#).unwrap();

        let err = resolve_params(&catalog, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DaqError>(),
            Some(DaqError::ProtocolMismatch(_))
        ));

        let defaults = temp_file(
            r#"{ "can_id_master": "0x80000700", "can_id_slave": "0x701", "byte_order": "big" }"#,
        );
        let params = resolve_params(&catalog, Some(defaults.path())).unwrap();
        assert_eq!(params.can_id_master, CanId::extended(0x700));
    }

    #[test]
    fn test_load_selection() {
        let file = temp_file("Signal Name [-];Event\nEngineSpeed;0A\nTemps;0x01\n");
        let selection = load_selection(file.path()).unwrap();
        assert_eq!(selection.len(), 2);
        assert_eq!(selection.channel("EngineSpeed"), Some(10));

        assert!(load_selection(Path::new("/nonexistent/signals.csv")).is_err());
    }
}
