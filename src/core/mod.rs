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

//! Runtime side of the analyzer: reading input, caching classifications and
//! driving the classifier over a batch of lines.

pub mod cache;
pub mod collector;
pub mod pipeline;

pub use cache::{DedupCache, ProcessedLogCache};
pub use pipeline::{ClassifiedLine, Pipeline, PipelineOutput, PipelineStats};
