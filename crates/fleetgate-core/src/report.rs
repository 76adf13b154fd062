//! Report writer: serialize a version map to a human-readable text file,
//! one block per version.

use std::path::Path;

use tracing::info;

use crate::domain::{Result, VersionMap};

const SEPARATOR: &str = "---------------------------------------------------";

/// Render the map with the sentinel bucket removed: a header per version
/// followed by its member hostnames in lexicographic order, then a
/// separator line.
pub fn render_version_report(map: &VersionMap) -> String {
    let mut out = String::new();
    for (version, hosts) in map.recognized() {
        out.push_str(&format!("Version {version}:\n"));
        for host in hosts {
            out.push_str(&host.host);
            out.push('\n');
        }
        out.push_str(SEPARATOR);
        out.push('\n');
    }
    out
}

/// Write the rendered report, overwriting any existing file.
pub fn write_version_report(map: &VersionMap, path: &Path) -> Result<()> {
    info!(file = %path.display(), "writing version report");
    std::fs::write(path, render_version_report(map))?;
    Ok(())
}
