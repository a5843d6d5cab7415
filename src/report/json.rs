use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::ScanError;
use crate::models::ComplianceReport;

/// Render the report as JSON indented with four spaces.
pub fn to_string(report: &ComplianceReport) -> Result<String, ScanError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    report.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Write the report to `path`, readable by the owner only.
pub fn write(report: &ComplianceReport, path: &Path) -> Result<(), ScanError> {
    let body = to_string(report)?;

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options
        .open(path)
        .and_then(|mut file| file.write_all(body.as_bytes()))
        .map_err(|source| ScanError::WriteReport {
            path: path.to_path_buf(),
            source,
        })
}
