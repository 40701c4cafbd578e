//! Port connection persistence
//!
//! One line per port owned by this client:
//!
//! ```text
//! libre_soundboard_client:out_l|system:playback_1
//! libre_soundboard_client:out_r|system:playback_2,other:in_2
//! libre_soundboard_client:keepalive_in|
//! ```
//!
//! An empty target list is valid. Blank lines, lines without `|` and lines
//! with an empty port name are skipped when reading.

use std::path::Path;

use anyhow::{Context, Result};

/// Saved routing of one port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConnections {
    /// Full port name (`client:port`)
    pub port: String,
    /// Full names of the ports it was connected to
    pub targets: Vec<String>,
}

impl PortConnections {
    pub fn new(port: impl Into<String>, targets: Vec<String>) -> Self {
        Self {
            port: port.into(),
            targets,
        }
    }

    /// Parse a single `port|t1,t2` line
    pub fn parse_line(line: &str) -> Option<Self> {
        let (port, rest) = line.trim().split_once('|')?;
        let port = port.trim();
        if port.is_empty() {
            return None;
        }
        let targets = rest
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();
        Some(Self::new(port, targets))
    }

    /// `port|t1,t2`
    pub fn to_line(&self) -> String {
        format!("{}|{}", self.port, self.targets.join(","))
    }
}

/// Parse a whole connections file, skipping malformed lines
pub fn parse_connections(text: &str) -> Vec<PortConnections> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let parsed = PortConnections::parse_line(line);
            if parsed.is_none() {
                log::debug!("Skipping malformed connection line: {:?}", line);
            }
            parsed
        })
        .collect()
}

pub fn format_connections(entries: &[PortConnections]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&entry.to_line());
        out.push('\n');
    }
    out
}

/// Read saved connections; a missing file is an empty routing
pub fn load_connections(path: &Path) -> Result<Vec<PortConnections>> {
    if !path.exists() {
        log::debug!("No saved connections at {:?}", path);
        return Ok(Vec::new());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read connections file: {:?}", path))?;
    Ok(parse_connections(&text))
}

/// Overwrite the connections file, creating parent directories
pub fn save_connections(path: &Path, entries: &[PortConnections]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }
    std::fs::write(path, format_connections(entries))
        .with_context(|| format!("Failed to write connections file: {:?}", path))?;
    log::info!("Saved {} port connection entries to {:?}", entries.len(), path);
    Ok(())
}

/// Rewrite saved ports of client `old` to belong to client `new`
///
/// Only the owning side is renamed; targets belong to other clients.
/// Returns whether anything changed (the file is only rewritten then).
pub fn rename_client(path: &Path, old: &str, new: &str) -> Result<bool> {
    if old == new {
        return Ok(false);
    }
    let mut entries = load_connections(path)?;
    let prefix = format!("{}:", old);
    let mut changed = false;
    for entry in entries.iter_mut() {
        if let Some(port) = entry.port.strip_prefix(&prefix) {
            entry.port = format!("{}:{}", new, port);
            changed = true;
        }
    }
    if changed {
        save_connections(path, &entries)?;
        log::info!("Renamed saved connections from client '{}' to '{}'", old, new);
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_variants() {
        assert_eq!(
            PortConnections::parse_line("sb:out_l|system:playback_1,other:in"),
            Some(PortConnections::new(
                "sb:out_l",
                vec!["system:playback_1".into(), "other:in".into()]
            ))
        );
        // Trailing `|` with nothing after it
        assert_eq!(
            PortConnections::parse_line("sb:out_r|"),
            Some(PortConnections::new("sb:out_r", vec![]))
        );
        assert_eq!(PortConnections::parse_line("no separator"), None);
        assert_eq!(PortConnections::parse_line("|system:playback_1"), None);
    }

    #[test]
    fn test_parse_skips_malformed_and_blank_lines() {
        let text = "sb:out_l|a:1\n\ngarbage\nsb:out_r|a:2,,a:3\n";
        let entries = parse_connections(text);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].targets, vec!["a:2", "a:3"]);
    }

    #[test]
    fn test_format_writes_empty_target_lists() {
        let entries = vec![
            PortConnections::new("sb:out_l", vec!["a:1".into(), "a:2".into()]),
            PortConnections::new("sb:out_r", vec![]),
        ];
        assert_eq!(format_connections(&entries), "sb:out_l|a:1,a:2\nsb:out_r|\n");
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let entries = load_connections(&dir.path().join("missing.cfg")).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("jack_connections.cfg");
        let entries = vec![
            PortConnections::new("sb:out_l", vec!["system:playback_1".into()]),
            PortConnections::new("sb:keepalive_in", vec![]),
        ];
        save_connections(&path, &entries).unwrap();
        assert_eq!(load_connections(&path).unwrap(), entries);
    }

    #[test]
    fn test_rename_client_rewrites_owned_ports_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jack_connections.cfg");
        std::fs::write(&path, "old:out_l|old_monitor:in\nother:out|x:1\n").unwrap();

        assert!(rename_client(&path, "old", "new").unwrap());
        let entries = load_connections(&path).unwrap();
        assert_eq!(entries[0].port, "new:out_l");
        assert_eq!(entries[0].targets, vec!["old_monitor:in"]);
        assert_eq!(entries[1].port, "other:out");

        assert!(!rename_client(&path, "absent", "new").unwrap());
        assert!(!rename_client(&path, "new", "new").unwrap());
    }
}
