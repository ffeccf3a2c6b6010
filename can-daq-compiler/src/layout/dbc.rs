//! DBC rendering of a decode table
//!
//! The DTO becomes a single multiplexed message: `DTOPID` (byte 0) is the
//! multiplexor and every row is a signal multiplexed on its PID.

use super::{DecodeRow, DecodeTable};
use crate::catalog::Signedness;
use crate::types::ByteOrder;
use std::collections::HashSet;
use std::fmt;

const NODE: &str = "Logger";
const MESSAGE_NAME: &str = "DTO";
const MULTIPLEXOR: &str = "DTOPID";
const SHORT_NAME_LEN: usize = 29;

const NEW_SYMBOLS: &[&str] = &[
    "NS_DESC_",
    "CM_",
    "BA_DEF_",
    "BA_",
    "VAL_",
    "CAT_DEF_",
    "CAT_",
    "FILTER",
    "BA_DEF_DEF_",
    "EV_DATA_",
    "ENVVAR_DATA_",
    "SGTYPE_",
    "SGTYPE_VAL_",
    "BA_DEF_SGTYPE_",
    "BA_SGTYPE_",
    "SIG_TYPE_REF_",
    "VAL_TABLE_",
    "SIG_GROUP_",
    "SIG_VALTYPE_",
    "SIGTYPE_VALTYPE_",
    "BO_TX_BU_",
    "BA_DEF_REL_",
    "BA_REL_",
    "BA_DEF_DEF_REL_",
    "BU_SG_REL_",
    "BU_EV_REL_",
    "BU_BO_REL_",
    "SG_MUL_VAL_",
];

/// Format a number for DBC output: at most 10 decimals, no trailing zeros
pub fn format_number(value: f64) -> String {
    let text = format!("{:.10}", value);
    let text = if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text.as_str()
    };
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// DBC-safe signal names for each row
///
/// Dots become underscores. When shortening, names are cut to 29 characters
/// and collisions get a `_00`, `_01`, ... suffix.
pub fn signal_names(rows: &[DecodeRow], shorten: bool) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();

    rows.iter()
        .map(|row| {
            let name = row.name.replace('.', "_");
            if !shorten {
                return name;
            }

            let base: String = name.chars().take(SHORT_NAME_LEN).collect();
            let mut candidate = base.clone();
            let mut suffix = 0u32;
            while used.contains(&candidate) {
                candidate = format!("{}_{:02}", base, suffix);
                suffix += 1;
            }
            used.insert(candidate.clone());
            candidate
        })
        .collect()
}

impl DecodeTable {
    /// Render the table as DBC text
    pub fn to_dbc(&self, shorten: bool) -> String {
        DbcDocument {
            table: self,
            names: signal_names(&self.rows, shorten),
        }
        .to_string()
    }

    fn frame_format(&self) -> &'static str {
        match (self.fd, self.can_id.extended) {
            (false, false) => "StandardCAN",
            (false, true) => "ExtendedCAN",
            (true, false) => "StandardCAN_FD",
            (true, true) => "ExtendedCAN_FD",
        }
    }

    fn bus_type(&self) -> &'static str {
        if self.fd {
            "CAN FD"
        } else {
            "CAN"
        }
    }
}

struct DbcDocument<'a> {
    table: &'a DecodeTable,
    names: Vec<String>,
}

impl fmt::Display for DbcDocument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.table;
        let id = table.can_id.to_raw();

        writeln!(f, "VERSION \"{}_DBC\"", table.protocol)?;
        writeln!(f)?;
        writeln!(f, "NS_ :")?;
        for symbol in NEW_SYMBOLS {
            writeln!(f, "    {}", symbol)?;
        }
        writeln!(f)?;
        writeln!(f, "BS_:")?;
        writeln!(f)?;
        writeln!(f, "BU_: {}", NODE)?;
        writeln!(f)?;

        writeln!(f, "BO_ {} {}: {} {}", id, MESSAGE_NAME, table.dlc(), NODE)?;
        writeln!(
            f,
            " SG_ {} M : 0|8@1+ (1,0) [0|255] \"\" {}",
            MULTIPLEXOR, NODE
        )?;
        for (row, name) in table.rows.iter().zip(&self.names) {
            write_signal(f, row, name)?;
        }
        writeln!(f)?;

        for (row, name) in table.rows.iter().zip(&self.names) {
            let comment = format!(
                "{} | {}",
                row.name,
                row.long_identifier.as_deref().unwrap_or("")
            );
            writeln!(f, "CM_ SG_ {} {} \"{}\";", id, name, quote_safe(&comment))?;
        }
        writeln!(f)?;

        writeln!(f, "BA_DEF_ \"BusType\" STRING ;")?;
        writeln!(f, "BA_DEF_ \"ProtocolType\" STRING ;")?;
        writeln!(f, "BA_DEF_ SG_ \"SystemSignalLongSymbol\" STRING ;")?;
        writeln!(
            f,
            "BA_DEF_ BO_ \"VFrameFormat\" ENUM \"StandardCAN\",\"ExtendedCAN\",{}\"StandardCAN_FD\",\"ExtendedCAN_FD\";",
            "\"reserved\",".repeat(12)
        )?;
        writeln!(f, "BA_DEF_ BO_ \"MessageIgnore\" INT 0 1;")?;
        writeln!(f, "BA_DEF_ SG_ \"SignalIgnore\" INT 0 1;")?;
        writeln!(f, "BA_DEF_DEF_ \"BusType\" \"\";")?;
        writeln!(f, "BA_DEF_DEF_ \"ProtocolType\" \"\";")?;
        writeln!(f, "BA_DEF_DEF_ \"VFrameFormat\" \"{}\";", table.frame_format())?;
        writeln!(f, "BA_DEF_DEF_ \"MessageIgnore\" 0;")?;
        writeln!(f, "BA_DEF_DEF_ \"SignalIgnore\" 0;")?;
        writeln!(f, "BA_DEF_DEF_ \"SystemSignalLongSymbol\" \"\";")?;
        writeln!(f, "BA_ \"BusType\" \"{}\";", table.bus_type())?;
        writeln!(f, "BA_ \"ProtocolType\" \"\";")?;
        writeln!(f, "BA_ \"SignalIgnore\" SG_ {} {} 1;", id, MULTIPLEXOR)?;

        let value_types: Vec<(&String, u8)> = table
            .rows
            .iter()
            .zip(&self.names)
            .filter_map(|(row, name)| match row.signedness {
                Signedness::Float => Some((name, 1)),
                Signedness::Double => Some((name, 2)),
                _ => None,
            })
            .collect();
        if !value_types.is_empty() {
            writeln!(f)?;
            for (name, value_type) in value_types {
                writeln!(f, "SIG_VALTYPE_ {} {} : {};", id, name, value_type)?;
            }
        }
        Ok(())
    }
}

fn write_signal(f: &mut fmt::Formatter<'_>, row: &DecodeRow, name: &str) -> fmt::Result {
    let order = match row.byte_order {
        ByteOrder::Little => '1',
        ByteOrder::Big => '0',
    };
    let sign = if row.signedness.is_unsigned() { '+' } else { '-' };

    writeln!(
        f,
        " SG_ {} m{} : {}|{}@{}{} ({},{}) [{}|{}] \"{}\" {}",
        name,
        row.multiplexor_value,
        row.start_bit,
        row.bit_length,
        order,
        sign,
        format_number(row.scale),
        format_number(row.offset),
        format_number(row.lower_limit),
        format_number(row.upper_limit),
        quote_safe(&row.unit),
        NODE
    )
}

/// DBC strings cannot contain double quotes
fn quote_safe(text: &str) -> String {
    text.replace('"', "'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ProtocolParams, Signal};
    use crate::grouping::group;
    use crate::layout::layout;
    use crate::types::{CanId, Protocol};

    fn row(name: &str) -> DecodeRow {
        DecodeRow {
            name: name.to_string(),
            long_identifier: None,
            daq_list_id: 0,
            odt_id: 0,
            multiplexor_value: 0,
            start_bit: 8,
            bit_length: 8,
            byte_order: ByteOrder::Little,
            signedness: Signedness::Unsigned,
            scale: 1.0,
            offset: 0.0,
            unit: String::new(),
            lower_limit: 0.0,
            upper_limit: 255.0,
        }
    }

    fn sample_table(params: &ProtocolParams) -> DecodeTable {
        let signals = vec![
            Signal::new("Engine.Speed", 0x1000, Signedness::Unsigned, 2, 1)
                .with_scaling(0.25, 0.0, "rpm")
                .with_limits(0.0, 16383.75)
                .with_long_identifier("Engine speed"),
            Signal::new("Coolant", 0x1004, Signedness::Signed, 2, 1).with_scaling(1.0, -40.0, "degC"),
            Signal::new("Lambda", 0x1008, Signedness::Float, 4, 1),
        ];
        let grouping = group(&signals, params, Protocol::Xcp).unwrap();
        layout(&grouping, params).unwrap()
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(0.25), "0.25");
        assert_eq!(format_number(-40.0), "-40");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.1 + 0.2), "0.3");
        assert_eq!(format_number(1.0 / 3.0), "0.3333333333");
    }

    #[test]
    fn test_signal_names() {
        let long = "A".repeat(40);
        let rows = vec![row("a.b.c"), row(&long), row(&long), row(&long)];

        assert_eq!(
            signal_names(&rows, false),
            vec!["a_b_c".to_string(), long.clone(), long.clone(), long.clone()]
        );

        let short = signal_names(&rows, true);
        let base = "A".repeat(29);
        assert_eq!(short[0], "a_b_c");
        assert_eq!(short[1], base);
        assert_eq!(short[2], format!("{}_00", base));
        assert_eq!(short[3], format!("{}_01", base));
    }

    #[test]
    fn test_dbc_text() {
        let params = ProtocolParams::new(CanId::standard(0x7E0), CanId::standard(0x7E1));
        let dbc = sample_table(&params).to_dbc(true);

        assert!(dbc.starts_with("VERSION \"XCP_DBC\"\n"));
        assert!(dbc.contains("BO_ 2017 DTO: 8 Logger\n"));
        assert!(dbc.contains(" SG_ DTOPID M : 0|8@1+ (1,0) [0|255] \"\" Logger\n"));
        assert!(dbc.contains(" SG_ Engine_Speed m0 : 8|16@1+ (0.25,0) [0|16383.75] \"rpm\" Logger\n"));
        assert!(dbc.contains(" SG_ Coolant m0 : 24|16@1- (1,-40) [0|0] \"degC\" Logger\n"));
        assert!(dbc.contains(" SG_ Lambda m1 : 8|32@1- (1,0) [0|0] \"\" Logger\n"));
        assert!(dbc.contains("CM_ SG_ 2017 Engine_Speed \"Engine.Speed | Engine speed\";\n"));
        assert!(dbc.contains("CM_ SG_ 2017 Coolant \"Coolant | \";\n"));
        assert!(dbc.contains("BA_DEF_DEF_ \"VFrameFormat\" \"StandardCAN\";\n"));
        assert!(dbc.contains("BA_ \"BusType\" \"CAN\";\n"));
        assert!(dbc.contains("BA_ \"SignalIgnore\" SG_ 2017 DTOPID 1;\n"));
        assert!(dbc.contains("SIG_VALTYPE_ 2017 Lambda : 1;\n"));
    }

    #[test]
    fn test_dbc_fd_extended() {
        let params = ProtocolParams::new(CanId::extended(0x100), CanId::extended(0x101))
            .with_can_fd(2_000_000)
            .with_byte_order(ByteOrder::Big);
        let dbc = sample_table(&params).to_dbc(false);

        assert!(dbc.contains(&format!("BO_ {} DTO: 64 Logger\n", 0x8000_0101u32)));
        assert!(dbc.contains("BA_DEF_DEF_ \"VFrameFormat\" \"ExtendedCAN_FD\";\n"));
        assert!(dbc.contains("BA_ \"BusType\" \"CAN FD\";\n"));
        // All three fit in one 63-byte ODT
        assert!(dbc.contains(" SG_ Coolant m0 : 31|16@0- (1,-40) [0|0] \"degC\" Logger\n"));
        assert!(dbc.contains(" SG_ Lambda m0 : 47|32@0- (1,0) [0|0] \"\" Logger\n"));
    }

    #[test]
    fn test_dbc_reparses() {
        let params = ProtocolParams::new(CanId::standard(0x7E0), CanId::standard(0x7E1));
        let text = sample_table(&params).to_dbc(true);

        let dbc = match can_dbc::DBC::from_slice(text.as_bytes()) {
            Ok(dbc) => dbc,
            Err(can_dbc::Error::Incomplete(dbc, _)) => dbc,
            Err(e) => panic!("failed to parse generated DBC: {:?}", e),
        };

        assert_eq!(dbc.messages().len(), 1);
        let message = &dbc.messages()[0];
        assert_eq!(message.message_id().0, 0x7E1);
        assert_eq!(*message.message_size(), 8);
        assert_eq!(message.signals().len(), 4);

        let mux = &message.signals()[0];
        assert_eq!(mux.name(), "DTOPID");
        assert!(matches!(
            mux.multiplexer_indicator(),
            can_dbc::MultiplexIndicator::Multiplexor
        ));

        let lambda = message
            .signals()
            .iter()
            .find(|s| s.name() == "Lambda")
            .unwrap();
        assert_eq!(*lambda.start_bit(), 8);
        assert_eq!(*lambda.signal_size(), 32);
        assert!(matches!(
            lambda.multiplexer_indicator(),
            can_dbc::MultiplexIndicator::MultiplexedSignal(1)
        ));
        assert_eq!(*lambda.value_type(), can_dbc::ValueType::Signed);
    }
}
