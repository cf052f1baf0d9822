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

//! LogSift: deduplicating LLM log classification and statistical anomaly
//! detection for server logs.
//!
//! Raw lines are split into [`parser::line::Event`]s, bucketed by time and
//! checked for volume, error-ratio and duration anomalies. Independently,
//! each distinct line is classified once by an external [`classifier`],
//! with near-duplicates answered from the [`core::cache`].

pub mod anomaly;
pub mod classifier;
pub mod config;
pub mod core;
pub mod parser;
pub mod report;
