//! Local version measurement: the coordinator's own runtime and platform
//! versions, the baseline the worker aggregate is compared against.

use tokio::process::Command;

use crate::domain::{GateError, Result, VersionId};
use crate::probes::{extract_platform_version, extract_runtime_version};

/// Measure the local runtime version. `java -version` prints its banner on
/// stderr, not stdout.
pub async fn local_runtime_version() -> Result<VersionId> {
    let output = Command::new("java")
        .arg("-version")
        .output()
        .await
        .map_err(|_| runtime_missing())?;
    let version = extract_runtime_version(&String::from_utf8_lossy(&output.stderr));
    if version.is_unrecognized() {
        return Err(runtime_missing());
    }
    Ok(version)
}

/// Measure the local platform version from `hadoop version` stdout.
pub async fn local_platform_version() -> Result<VersionId> {
    let output = Command::new("hadoop")
        .arg("version")
        .output()
        .await
        .map_err(|_| platform_missing())?;
    let version = extract_platform_version(&String::from_utf8_lossy(&output.stdout));
    if version.is_unrecognized() {
        return Err(platform_missing());
    }
    Ok(version)
}

fn runtime_missing() -> GateError {
    GateError::MissingTool {
        tool: "java".to_string(),
        hint: "check whether Java is installed, using 'java -version'".to_string(),
    }
}

fn platform_missing() -> GateError {
    GateError::MissingTool {
        tool: "hadoop".to_string(),
        hint: "check whether Hadoop is installed and its executables are on \
               the PATH; verify with 'hadoop version' and 'echo $PATH'"
            .to_string(),
    }
}
