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

//! Classification through a local Ollama server.

use super::{Classifier, ClassifyError};
use crate::config::ClassifierConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const PROMPT_TEMPLATE: &str = r#"Analyze the following log line:

"{log_line}"

Reply with exactly **one valid JSON object**.
Do not write any explanation, comment, extra information or a second JSON block.

"event_type" must be a short, general event type.
Details such as IP addresses or user names must not appear in it.

Use this structure:

{
  "event_type": "Login Failure, Disk Warning",
  "has_error": true or false,
  "user_action_successful": true or false,
  "is_critical": true or false
}
"#;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

pub struct OllamaClassifier {
    client: reqwest::blocking::Client,
    url: String,
    model: String,
}

impl OllamaClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifyError> {
        // No timeout unless configured, local models can take minutes on a cold start
        let timeout = config.timeout_secs.map(Duration::from_secs);
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: format!("{}/api/generate", config.endpoint.trim_end_matches('/')),
            model: config.model.clone(),
        })
    }

    fn prompt(line: &str) -> String {
        PROMPT_TEMPLATE.replace("{log_line}", line)
    }
}

impl Classifier for OllamaClassifier {
    fn classify(&self, line: &str) -> Result<String, ClassifyError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: Self::prompt(line),
            stream: false,
        };

        tracing::trace!("Classifying via {}: {line}", self.url);
        let response = self.client.post(&self.url).json(&request).send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ClassifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let generated: GenerateResponse = response.json()?;
        Ok(generated.response)
    }
}
