// LogSift - GPL-3.0-or-later
// This file is part of LogSift.
//
// Copyright (C) 2026 Daniel Freiermuth
//
// LogSift is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// LogSift is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with LogSift.  If not, see <https://www.gnu.org/licenses/>.

use std::fs;
use std::io;
use std::path::Path;

/// Read the non-empty lines of a log file, trimmed.
///
/// Bytes that aren't valid UTF-8 are replaced rather than rejected; logs
/// routinely carry binary payloads. A missing file yields no lines.
pub fn read_lines(path: &Path) -> io::Result<Vec<String>> {
    let buffer = match fs::read(path) {
        Ok(buffer) => buffer,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!("Log file {} not found, nothing to analyze", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let lines = split_lines(&String::from_utf8_lossy(&buffer));
    tracing::info!("Read {} lines from {}", lines.len(), path.display());
    Ok(lines)
}

/// Trimmed, non-empty lines of `content`
#[must_use]
pub fn split_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
