//! Signal filtering: catalog measurements × user selection → signals
//!
//! Invalid signals are dropped with a warning here, before grouping, so that
//! only capacity problems remain fatal later on.

use crate::catalog::measurement::Measurement;
use crate::catalog::params::ProtocolParams;
use crate::catalog::selection::Selection;
use crate::catalog::signal::Signal;
use std::collections::HashSet;

/// Result of matching the catalog against a selection
#[derive(Debug, Clone, Default)]
pub struct Selected {
    /// Valid signals in catalog order
    pub signals: Vec<Signal>,
    /// Selection names that matched (directly or as a matrix base name)
    pub matched: HashSet<String>,
}

impl Selected {
    pub fn is_matched(&self, name: &str) -> bool {
        self.matched.contains(name)
    }
}

/// Base name of an expanded matrix element (`Temps_MX_3` → `Temps`)
pub fn matrix_base_name(name: &str) -> Option<&str> {
    let (base, index) = name.rsplit_once("_MX_")?;
    if base.is_empty() || index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(base)
}

/// Match measurements against the selection and validate the resulting signals
pub fn select_signals(
    measurements: &[Measurement],
    selection: &Selection,
    params: &ProtocolParams,
) -> Selected {
    let mut selected = Selected::default();
    let mut seen: HashSet<String> = HashSet::new();

    let expanded = measurements.iter().flat_map(Measurement::expand_matrix);

    for measurement in expanded {
        let name = measurement.name.trim().to_string();
        let base_name = matrix_base_name(&name);

        let channel = match selection.channel(&name) {
            Some(channel) => channel,
            None => match base_name.and_then(|base| selection.channel(base)) {
                Some(channel) => channel,
                None => continue,
            },
        };
        if seen.contains(&name) {
            continue;
        }

        let signal = match measurement.to_signal(channel) {
            Ok(signal) => signal,
            Err(e) => {
                log::warn!("Removed {}: {}", name, e);
                continue;
            }
        };
        if let Err(e) = signal.validate(params) {
            log::warn!("Removed {}: {}", name, e);
            continue;
        }

        seen.insert(name.clone());
        if let Some(base) = base_name.filter(|base| selection.channel(base).is_some()) {
            selected.matched.insert(base.to_string());
        }
        selected.matched.insert(name);
        selected.signals.push(signal);
    }

    log::debug!(
        "Selected {} signals ({} names matched)",
        selected.signals.len(),
        selected.matched.len()
    );
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CanId;

    fn params() -> ProtocolParams {
        ProtocolParams::new(CanId::standard(0x7E0), CanId::standard(0x7E1))
    }

    #[test]
    fn test_matrix_base_name() {
        assert_eq!(matrix_base_name("Temps_MX_3"), Some("Temps"));
        assert_eq!(matrix_base_name("Temps_MX_"), None);
        assert_eq!(matrix_base_name("Temps_MX_a"), None);
        assert_eq!(matrix_base_name("Temps"), None);
    }

    #[test]
    fn test_select_direct_and_matrix() {
        let mut temps = Measurement::new("Temps", "UBYTE", 0x3000);
        temps.matrix_dim = 2;
        let measurements = vec![
            Measurement::new("EngSpeed", "UWORD", 0x1000),
            temps,
            Measurement::new("Unselected", "UWORD", 0x1100),
        ];
        let selection = Selection::new().with("Temps", 2).with("EngSpeed", 1);

        let selected = select_signals(&measurements, &selection, &params());
        let names: Vec<&str> = selected.signals.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["EngSpeed", "Temps_MX_0", "Temps_MX_1"]);
        assert_eq!(selected.signals[2].event_channel, 2);
        assert_eq!(selected.signals[2].ecu_address, 0x3001);
        assert!(selected.is_matched("Temps"));
        assert!(selected.is_matched("EngSpeed"));
        assert!(!selected.is_matched("Unselected"));
    }

    #[test]
    fn test_invalid_signals_dropped() {
        let measurements = vec![
            Measurement::new("Blob", "BLOB", 0x1000),
            Measurement::new("Counter64", "A_UINT64", 0x1008),
            Measurement::new("Ok", "ULONG", 0x1010),
        ];
        let selection = Selection::new()
            .with("Blob", 1)
            .with("Counter64", 1)
            .with("Ok", 1);

        let selected = select_signals(&measurements, &selection, &params());
        assert_eq!(selected.signals.len(), 1);
        assert_eq!(selected.signals[0].name, "Ok");
        assert!(!selected.is_matched("Counter64"));

        // With CAN FD the 8-byte signal fits
        let fd = params().with_can_fd(2_000_000);
        let selected = select_signals(&measurements, &selection, &fd);
        assert_eq!(selected.signals.len(), 2);

        // MAX_DTO 4 only carries up to 3-byte entries
        let small = params().with_transfer_sizes(8, 4);
        let selected = select_signals(&measurements, &selection, &small);
        assert!(selected.signals.is_empty());
        assert!(!selected.is_matched("Ok"));
    }
}
