//! User signal selection (`name;event` rows)

use crate::catalog::numeric::parse_hex;

/// One selected signal and its requested event channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionEntry {
    pub name: String,
    /// Event column as written in the file
    pub event: String,
    pub channel: u16,
}

/// Ordered mapping from signal name to requested event channel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    entries: Vec<SelectionEntry>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `;`-separated selection file
    ///
    /// Header rows (names containing `[`), empty names and rows with fewer
    /// than two columns are skipped. Fields may be quoted. The event column
    /// is hexadecimal.
    pub fn parse(text: &str) -> Self {
        let mut selection = Self::new();

        for (line_no, line) in text.lines().enumerate() {
            let columns: Vec<&str> = line.split(';').collect();
            if columns.len() < 2 {
                continue;
            }
            let name = unquote(columns[0]);
            let event = unquote(columns[1]);
            if name.is_empty() || name.contains('[') {
                continue;
            }

            let channel = match parse_hex(event).and_then(|v| u16::try_from(v).ok()) {
                Some(channel) => channel,
                None => {
                    log::warn!(
                        "Line {}: invalid event channel '{}' for {}, skipping",
                        line_no + 1,
                        event,
                        name
                    );
                    continue;
                }
            };
            selection.insert(name, event, channel);
        }

        selection
    }

    /// Add or replace an entry; a replaced entry keeps its position
    pub fn insert(&mut self, name: &str, event: &str, channel: u16) {
        let entry = SelectionEntry {
            name: name.to_string(),
            event: event.to_string(),
            channel,
        };
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Builder method: add an entry with a numeric channel
    pub fn with(mut self, name: &str, channel: u16) -> Self {
        self.insert(name, &format!("0x{:02X}", channel), channel);
        self
    }

    pub fn channel(&self, name: &str) -> Option<u16> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.channel)
    }

    pub fn entries(&self) -> &[SelectionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Trim a field and strip one pair of surrounding double quotes
fn unquote(field: &str) -> &str {
    let field = field.trim();
    field
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .map(str::trim)
        .unwrap_or(field)
}
