//! Version probes: pure extractors that pull a version token out of raw
//! command output.
//!
//! Absence of a match is a normal return value (the sentinel), never an
//! error, and extraction is deterministic.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::VersionId;

fn runtime_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // `java -version` prints e.g. `openjdk version "1.8.0_292"`.
    RE.get_or_init(|| Regex::new(r#"(?m)version "(.*)"$"#).expect("valid runtime pattern"))
}

fn platform_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // `hadoop version` prints e.g. `Hadoop 2.7.3` on its first line.
    RE.get_or_init(|| Regex::new(r"(?m)Hadoop (.*)$").expect("valid platform pattern"))
}

/// Extract the runtime version from `java -version` style output.
pub fn extract_runtime_version(output: &str) -> VersionId {
    extract(runtime_pattern(), output)
}

/// Extract the platform version from `hadoop version` style output.
pub fn extract_platform_version(output: &str) -> VersionId {
    extract(platform_pattern(), output)
}

fn extract(pattern: &Regex, output: &str) -> VersionId {
    match pattern
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
    {
        Some(version) if !version.is_empty() => VersionId::new(version),
        _ => VersionId::unrecognized(),
    }
}
