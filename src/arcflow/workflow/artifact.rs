// SPDX-License-Identifier: MIT

//! Arc-file segment parser
//!
//! Generated output carries artifacts as tagged segments:
//!
//! ```text
//! <arc-file type="file" path="src/app.py">...file body...</arc-file>
//! <arc-file type="shell">pip install -r requirements.txt
//! uvicorn app:app</arc-file>
//! ```
//!
//! Tags match case-insensitively and non-greedily, in document order.
//! Unrecognized attributes are ignored, as are segments whose `type` is
//! neither `file` nor `shell`, and `file` segments without a `path`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::arcflow::workflow::state::FileArtifact;

static SEGMENT: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"(?is)<arc-file\s+([^>]+)>(.*?)</arc-file>"));

static ATTRIBUTE: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r#"(?i)([a-z_-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#));

/// Files and shell commands found in generated output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifacts {
    pub files: Vec<FileArtifact>,
    /// Non-empty, trimmed lines of every shell segment, in order
    pub commands: Vec<String>,
}

impl Artifacts {
    /// Split shell lines into (install commands, start command)
    ///
    /// The last line starts the service; any lines before it install
    /// dependencies.
    pub fn split_commands(&self) -> (Vec<String>, Option<String>) {
        match self.commands.split_last() {
            Some((start, installs)) => (installs.to_vec(), Some(start.clone())),
            None => (Vec::new(), None),
        }
    }
}

fn attribute<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    let re = ATTRIBUTE.as_ref().ok()?;
    re.captures_iter(attrs).find_map(|caps| {
        let key = caps.get(1)?.as_str();
        if !key.eq_ignore_ascii_case(name) {
            return None;
        }
        caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str().trim())
    })
}

/// Parse every arc-file segment out of `raw`
pub fn parse(raw: &str) -> Artifacts {
    let mut artifacts = Artifacts::default();
    let re = match SEGMENT.as_ref() {
        Ok(re) => re,
        Err(e) => {
            log::error!("Arc-file pattern failed to compile: {}", e);
            return artifacts;
        }
    };

    for caps in re.captures_iter(raw) {
        let attrs = caps.get(1).map_or("", |m| m.as_str());
        let body = caps.get(2).map_or("", |m| m.as_str());

        match attribute(attrs, "type").map(str::to_lowercase).as_deref() {
            Some("file") => match attribute(attrs, "path") {
                Some(path) if !path.is_empty() => artifacts.files.push(FileArtifact {
                    file_path: path.to_string(),
                    content: body.to_string(),
                }),
                _ => log::warn!("Skipping arc-file segment without a path"),
            },
            Some("shell") => artifacts.commands.extend(
                body.lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(String::from),
            ),
            other => log::debug!("Ignoring arc-file segment of type {:?}", other),
        }
    }

    artifacts
}
