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

use indexmap::IndexMap;

/// Labels occurring more than `min_count` times, with their counts.
///
/// Labels are compared verbatim; normalize them beforehand if near-identical
/// messages should be counted together. Results come in first-seen order.
#[must_use]
pub fn frequency_anomalies<I, S>(labels: I, min_count: usize) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for label in labels {
        let label = label.as_ref();
        if let Some(count) = counts.get_mut(label) {
            *count += 1;
        } else {
            counts.insert(label.to_string(), 1);
        }
    }

    counts
        .into_iter()
        .filter(|(_, count)| *count > min_count)
        .collect()
}
