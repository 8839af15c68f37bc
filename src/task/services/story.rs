//! Parser for markdown story documents.
//!
//! A story lists tasks under `### Task <number>: <title>` headings. Inside a
//! task block, `**Assignee:**`, `**Priority:**` and `**Labels:**` marker lines
//! set fields; every other non-blank line joins the description. Unknown
//! assignee or priority values are ignored and the defaults kept.

use crate::task::domain::{AgentRole, Priority, StoryId};
use regex::Regex;
use std::sync::LazyLock;

const HEADING_PREFIX: &str = "### Task";
const ASSIGNEE_MARKER: &str = "**Assignee:**";
const PRIORITY_MARKER: &str = "**Priority:**";
const LABELS_MARKER: &str = "**Labels:**";

#[expect(clippy::expect_used, reason = "the pattern is a literal")]
static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^### Task (\d+(?:\.\d+)*): (.+)$").expect("valid task heading pattern")
});

#[expect(clippy::expect_used, reason = "the pattern is a literal")]
static STORY_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)story[_-]id:\s*([a-f0-9-]+)").expect("valid story id pattern")
});

/// Task block extracted from a story document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryTask {
    /// Dotted task number, e.g. `1.2`.
    pub number: String,
    /// Heading title without the number.
    pub title: String,
    /// Non-marker lines joined with newlines.
    pub description: String,
    /// Priority from the marker line, or the default.
    pub priority: Priority,
    /// Assignee from the marker line, when recognised.
    pub assignee: Option<AgentRole>,
    /// Comma-separated labels from the marker line.
    pub labels: Vec<String>,
}

impl StoryTask {
    fn new(number: &str, title: &str) -> Self {
        Self {
            number: number.to_owned(),
            title: title.trim().to_owned(),
            description: String::new(),
            priority: Priority::default(),
            assignee: None,
            labels: Vec::new(),
        }
    }

    fn absorb(&mut self, line: &str) {
        let trimmed = line.trim_start();
        if let Some(value) = trimmed.strip_prefix(ASSIGNEE_MARKER) {
            if let Ok(role) = AgentRole::try_from(value) {
                self.assignee = Some(role);
            }
        } else if let Some(value) = trimmed.strip_prefix(PRIORITY_MARKER) {
            if let Ok(priority) = Priority::try_from(value) {
                self.priority = priority;
            }
        } else if let Some(value) = trimmed.strip_prefix(LABELS_MARKER) {
            self.labels = value
                .split(',')
                .map(str::trim)
                .filter(|label| !label.is_empty())
                .map(ToOwned::to_owned)
                .collect();
        } else if !trimmed.is_empty() {
            if !self.description.is_empty() {
                self.description.push('\n');
            }
            self.description.push_str(line.trim_end());
        }
    }
}

/// Result of parsing a story document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedStory {
    /// Story identifier found anywhere in the document.
    pub story_id: Option<StoryId>,
    /// Task blocks in document order.
    pub tasks: Vec<StoryTask>,
}

/// Parses a story document.
///
/// A task block runs until the next line starting with `### Task`; such a
/// line that is not a well-formed heading ends the block without opening a
/// new one.
#[must_use]
pub fn parse_story(content: &str) -> ParsedStory {
    let mut tasks = Vec::new();
    let mut current: Option<StoryTask> = None;

    for line in content.lines() {
        if line.starts_with(HEADING_PREFIX) {
            tasks.extend(current.take());
            current = HEADING.captures(line.trim_end()).and_then(|captures| {
                let number = captures.get(1)?.as_str();
                let title = captures.get(2)?.as_str();
                Some(StoryTask::new(number, title))
            });
        } else if let Some(task) = current.as_mut() {
            task.absorb(line);
        }
    }
    tasks.extend(current);

    ParsedStory {
        story_id: find_story_id(content),
        tasks,
    }
}

fn find_story_id(content: &str) -> Option<StoryId> {
    let raw = STORY_ID.captures(content)?.get(1)?.as_str();
    raw.parse().ok()
}
