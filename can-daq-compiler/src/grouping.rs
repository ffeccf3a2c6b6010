//! Grouping engine
//!
//! Assigns every signal a (DAQ list, ODT, ODT entry) triple. One DAQ list is
//! created per requested event channel, in first-seen order, and signals are
//! packed into ODTs with sequential next-fit: an ODT is closed as soon as the
//! next signal no longer fits behind the 1-byte PID. Signals are never split
//! or reordered.
//!
//! The resulting [`Grouping`] is the single snapshot from which both the
//! command frames and the decode table are derived.

use crate::catalog::{ProtocolParams, Signal};
use crate::types::{Capacity, DaqError, Protocol, Result};

/// A signal with its DAQ list, ODT and ODT entry assignment
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedSignal {
    pub signal: Signal,
    pub daq_list_id: u16,
    pub odt_id: u16,
    pub odt_entry_id: u16,
}

/// One DAQ list of a grouping, with its ODTs as contiguous slices
#[derive(Debug, Clone)]
pub struct DaqListView<'a> {
    pub id: u16,
    pub event_channel: u16,
    /// ODTs in ascending id order; ODT `i` has id `i`
    pub odts: Vec<&'a [GroupedSignal]>,
}

impl DaqListView<'_> {
    pub fn odt_count(&self) -> usize {
        self.odts.len()
    }

    /// Id of the list's last ODT
    pub fn last_odt_id(&self) -> u16 {
        self.odts
            .last()
            .and_then(|odt| odt.first())
            .map(|entry| entry.odt_id)
            .unwrap_or(0)
    }
}

/// Grouped signals in (DAQ list, ODT, entry) ascending order
#[derive(Debug, Clone)]
pub struct Grouping {
    protocol: Protocol,
    signals: Vec<GroupedSignal>,
}

impl Grouping {
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn signals(&self) -> &[GroupedSignal] {
        &self.signals
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// View the grouping as DAQ lists of ODT slices
    pub fn daq_lists(&self) -> Vec<DaqListView<'_>> {
        let mut lists: Vec<DaqListView<'_>> = Vec::new();
        let signals = &self.signals;
        let mut start = 0;

        for end in 1..=signals.len() {
            let boundary = end == signals.len()
                || signals[end].daq_list_id != signals[start].daq_list_id
                || signals[end].odt_id != signals[start].odt_id;
            if !boundary {
                continue;
            }

            let odt = &signals[start..end];
            let first = &odt[0];
            match lists.last_mut() {
                Some(list) if list.id == first.daq_list_id => list.odts.push(odt),
                _ => lists.push(DaqListView {
                    id: first.daq_list_id,
                    event_channel: first.signal.event_channel,
                    odts: vec![odt],
                }),
            }
            start = end;
        }

        lists
    }
}

/// Partition signals by requested event channel, in first-seen channel order
pub fn partition_by_channel(signals: &[Signal]) -> Vec<(u16, Vec<&Signal>)> {
    let mut buckets: Vec<(u16, Vec<&Signal>)> = Vec::new();

    for signal in signals {
        match buckets
            .iter_mut()
            .find(|(channel, _)| *channel == signal.event_channel)
        {
            Some((_, bucket)) => bucket.push(signal),
            None => buckets.push((signal.event_channel, vec![signal])),
        }
    }

    buckets
}

/// Group signals into DAQ lists and ODTs
///
/// Fails with `EmptyInput` if there are no signals, with `InvalidSignal` if a
/// signal does not fit an ODT and, for CCP, with `CapacityExceeded` if a DAQ
/// list needs more ODTs than the ECU declares.
pub fn group(signals: &[Signal], params: &ProtocolParams, protocol: Protocol) -> Result<Grouping> {
    if signals.is_empty() {
        return Err(DaqError::EmptyInput);
    }

    let max_payload = params.max_odt_payload();
    let mut grouped = Vec::with_capacity(signals.len());

    for (daq_index, (channel, bucket)) in partition_by_channel(signals).into_iter().enumerate() {
        let daq_list_id = u16::try_from(daq_index).map_err(|_| {
            DaqError::capacity(
                Capacity::CommandField { field: "daq_list" },
                daq_index,
                usize::from(u16::MAX),
            )
        })?;
        let mut odt_id: u16 = 0;
        let mut odt_size: usize = 0;
        let mut entry_count: u16 = 0;

        for signal in bucket {
            signal.validate(params)?;
            let length = usize::from(signal.length_bytes);
            if odt_size + length > max_payload {
                log::debug!(
                    "DAQ list {} (event {}): closing ODT {} at {} of {} bytes",
                    daq_list_id,
                    channel,
                    odt_id,
                    odt_size,
                    max_payload
                );
                odt_id = odt_id.checked_add(1).ok_or_else(|| {
                    DaqError::capacity(
                        Capacity::CommandField { field: "odt" },
                        usize::from(u16::MAX) + 1,
                        usize::from(u16::MAX),
                    )
                })?;
                odt_size = 0;
                entry_count = 0;
            }

            grouped.push(GroupedSignal {
                signal: signal.clone(),
                daq_list_id,
                odt_id,
                odt_entry_id: entry_count,
            });
            entry_count += 1;
            odt_size += length;
        }
    }

    let grouping = Grouping {
        protocol,
        signals: grouped,
    };

    if protocol == Protocol::Ccp {
        check_ccp_capacity(&grouping, params)?;
    }

    log::info!(
        "Grouped {} signals into {} DAQ lists",
        grouping.len(),
        grouping.daq_lists().len()
    );
    Ok(grouping)
}

/// Compare the ODTs used per DAQ list against the ECU's declared lengths
fn check_ccp_capacity(grouping: &Grouping, params: &ProtocolParams) -> Result<()> {
    for list in grouping.daq_lists() {
        let used = list.odt_count();
        match params.daq_list_info(list.id) {
            Some(info) if used > usize::from(info.max_odts) => {
                log::error!(
                    "DAQ list 0x{:04X} exceeds maximum ODT capacity ({} assigned, {} allowed); \
                     split measurements across more event channels",
                    list.id,
                    used,
                    info.max_odts
                );
                return Err(DaqError::capacity(
                    Capacity::OdtsPerDaqList { daq_list: list.id },
                    used,
                    usize::from(info.max_odts),
                ));
            }
            Some(_) => {}
            None => log::debug!("DAQ list 0x{:04X} has no declared capacity", list.id),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Signedness;
    use crate::types::CanId;

    fn params() -> ProtocolParams {
        ProtocolParams::new(CanId::standard(0x7E0), CanId::standard(0x7E1))
    }

    fn sig(name: &str, length: u8, channel: u16) -> Signal {
        Signal::new(name, 0x1000, Signedness::Unsigned, length, channel)
    }

    #[test]
    fn test_partition_first_seen_order() {
        let signals = vec![sig("a", 1, 5), sig("b", 1, 2), sig("c", 1, 5), sig("d", 1, 9)];
        let buckets = partition_by_channel(&signals);
        let channels: Vec<u16> = buckets.iter().map(|(c, _)| *c).collect();
        assert_eq!(channels, vec![5, 2, 9]);
        let names: Vec<&str> = buckets[0].1.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_next_fit_packing() {
        // 4 + 2 fit in 7 bytes, the next 4 opens ODT 1, then 1 + 2 still fit
        let signals = vec![
            sig("a", 4, 1),
            sig("b", 2, 1),
            sig("c", 4, 1),
            sig("d", 1, 1),
            sig("e", 2, 1),
        ];
        let grouping = group(&signals, &params(), Protocol::Xcp).unwrap();
        let triples: Vec<(u16, u16, u16)> = grouping
            .signals()
            .iter()
            .map(|g| (g.daq_list_id, g.odt_id, g.odt_entry_id))
            .collect();
        assert_eq!(
            triples,
            vec![(0, 0, 0), (0, 0, 1), (0, 1, 0), (0, 1, 1), (0, 1, 2)]
        );
    }

    #[test]
    fn test_next_fit_never_backfills() {
        // "c" would fit in ODT 0 but packing is sequential
        let signals = vec![sig("a", 4, 1), sig("b", 4, 1), sig("c", 1, 1)];
        let grouping = group(&signals, &params(), Protocol::Xcp).unwrap();
        assert_eq!(grouping.signals()[2].odt_id, 1);
        assert_eq!(grouping.signals()[2].odt_entry_id, 1);
    }

    #[test]
    fn test_daq_list_views() {
        let signals = vec![sig("a", 4, 7), sig("b", 4, 3), sig("c", 4, 7), sig("d", 4, 7)];
        let grouping = group(&signals, &params(), Protocol::Xcp).unwrap();
        let lists = grouping.daq_lists();

        assert_eq!(lists.len(), 2);
        assert_eq!(lists[0].id, 0);
        assert_eq!(lists[0].event_channel, 7);
        assert_eq!(lists[0].odt_count(), 3);
        assert_eq!(lists[0].last_odt_id(), 2);
        assert_eq!(lists[1].event_channel, 3);
        assert_eq!(lists[1].odts[0][0].signal.name, "b");

        // Output is ordered by DAQ list, so "b" comes last
        let names: Vec<&str> = grouping
            .signals()
            .iter()
            .map(|g| g.signal.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "c", "d", "b"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            group(&[], &params(), Protocol::Xcp),
            Err(DaqError::EmptyInput)
        ));
    }

    #[test]
    fn test_oversized_signal_rejected() {
        // 3 bytes fit behind the PID with MAX_DTO 4
        let params = params().with_transfer_sizes(8, 4);
        let signals = vec![sig("a", 2, 1), sig("b", 4, 1)];

        match group(&signals, &params, Protocol::Ccp) {
            Err(DaqError::InvalidSignal { name, .. }) => assert_eq!(name, "b"),
            other => panic!("expected invalid signal, got {:?}", other),
        }
    }

    #[test]
    fn test_small_dto_keeps_odt_ids_dense() {
        let params = params().with_transfer_sizes(8, 4);
        let signals = vec![sig("a", 2, 1), sig("b", 2, 1), sig("c", 1, 1), sig("d", 3, 1)];
        let grouping = group(&signals, &params, Protocol::Ccp).unwrap();

        let odts: Vec<u16> = grouping.signals().iter().map(|g| g.odt_id).collect();
        assert_eq!(odts, vec![0, 1, 1, 2]);
        let lists = grouping.daq_lists();
        assert_eq!(lists[0].odt_count(), 3);
        assert_eq!(lists[0].last_odt_id(), 2);
    }

    #[test]
    fn test_odt_id_overflow() {
        // MAX_DTO 2 puts every 1-byte signal in its own ODT
        let params = params().with_transfer_sizes(8, 2);
        let signals: Vec<Signal> = (0..=usize::from(u16::MAX) + 1)
            .map(|i| sig(&format!("s{}", i), 1, 1))
            .collect();

        assert!(matches!(
            group(&signals, &params, Protocol::Xcp),
            Err(DaqError::CapacityExceeded {
                resource: Capacity::CommandField { field: "odt" },
                ..
            })
        ));
    }

    #[test]
    fn test_ccp_capacity_exceeded() {
        let params = params().add_daq_list(0, 2, 0);
        let signals = vec![sig("a", 4, 1), sig("b", 4, 1), sig("c", 4, 1)];

        match group(&signals, &params, Protocol::Ccp) {
            Err(DaqError::CapacityExceeded {
                resource,
                used,
                limit,
            }) => {
                assert_eq!(resource, Capacity::OdtsPerDaqList { daq_list: 0 });
                assert_eq!(used, 3);
                assert_eq!(limit, 2);
            }
            other => panic!("expected capacity error, got {:?}", other),
        }

        // XCP does not check declared capacities
        assert!(group(&signals, &params, Protocol::Xcp).is_ok());
    }
}
