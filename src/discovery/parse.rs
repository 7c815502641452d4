//! Enumeration output scanner
//!
//! The discovery helper (and the worker binary's enumeration mode) print
//! sources as a device-declaration line followed by an address line:
//!
//! ```text
//! Found 2 devices
//! Device A (Channel 1) with 1 configurations
//!   address: 10.0.0.5:5960
//! ```
//!
//! The scanner is an explicit two-state machine: a device line establishes a
//! pending record, the next address line completes and emits it. Malformed or
//! out-of-order lines are skipped; a second device line replaces the pending
//! record.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A network-addressable video source found by discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredSource {
    pub name: String,
    pub address: String,
}

enum ScanState {
    AwaitingDevice,
    AwaitingAddress { name: String },
}

/// Scan enumeration output for source records, in input order.
pub fn parse_enumeration(output: &str) -> Vec<DiscoveredSource> {
    let device_re = Regex::new(r"^Device\s+(.+?)\s+with\s+\d+\s+configurations?\b").unwrap();
    let address_re = Regex::new(r"^address:\s*(.+)$").unwrap();

    let mut sources = Vec::new();
    let mut state = ScanState::AwaitingDevice;

    for raw in output.lines() {
        let line = raw.trim();

        if let Some(caps) = device_re.captures(line) {
            // A device line always starts a fresh pending record, replacing
            // any record still waiting for its address.
            state = ScanState::AwaitingAddress {
                name: strip_qualifier(caps[1].trim()).to_string(),
            };
            continue;
        }

        if let ScanState::AwaitingAddress { name } = &state {
            if let Some(caps) = address_re.captures(line) {
                sources.push(DiscoveredSource {
                    name: name.clone(),
                    address: caps[1].trim().to_string(),
                });
                state = ScanState::AwaitingDevice;
            }
        }
    }

    sources
}

/// Strip a trailing parenthesized qualifier, e.g. `HOST (Channel 1)` -> `HOST`.
fn strip_qualifier(name: &str) -> &str {
    if name.ends_with(')') {
        if let Some(idx) = name.rfind(" (") {
            return name[..idx].trim_end();
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_sources_in_input_order() {
        let output = "Found 2 devices\n\
                      Device A (x) with 1 configurations\n\
                      \taddress: 10.0.0.5:5960\n\
                      Device B (y) with 1 configurations\n\
                      \taddress: 10.0.0.6:5960\n";
        let sources = parse_enumeration(output);
        assert_eq!(
            sources,
            vec![
                DiscoveredSource {
                    name: "A".to_string(),
                    address: "10.0.0.5:5960".to_string(),
                },
                DiscoveredSource {
                    name: "B".to_string(),
                    address: "10.0.0.6:5960".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_orphan_address_is_skipped() {
        let output = "address: 10.0.0.1:5960\n\
                      Device C with 1 configurations\n\
                      address: 10.0.0.2:5960\n";
        let sources = parse_enumeration(output);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name, "C");
        assert_eq!(sources[0].address, "10.0.0.2:5960");
    }

    #[test]
    fn test_second_device_replaces_pending() {
        let output = "Device Lost with 1 configurations\n\
                      Device Kept with 1 configurations\n\
                      address: 10.0.0.3:5960\n";
        let sources = parse_enumeration(output);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name, "Kept");
    }

    #[test]
    fn test_noise_between_device_and_address() {
        let output = "Device Cam with 3 configurations\n\
                      some unrelated diagnostic line\n\
                      address: 192.168.1.20:5961\n";
        let sources = parse_enumeration(output);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].address, "192.168.1.20:5961");
    }

    #[test]
    fn test_name_without_qualifier_kept_verbatim() {
        let output = "Device PLAIN-NAME with 1 configurations\naddress: unknown\n";
        let sources = parse_enumeration(output);
        assert_eq!(sources[0].name, "PLAIN-NAME");
        assert_eq!(sources[0].address, "unknown");
    }

    #[test]
    fn test_empty_output() {
        assert!(parse_enumeration("").is_empty());
        assert!(parse_enumeration("Found 0 devices\n").is_empty());
    }
}
