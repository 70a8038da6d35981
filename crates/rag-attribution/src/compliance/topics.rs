//! Official topic lists

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::TopicId;

#[derive(Deserialize)]
struct JsonTopic {
    id: TopicId,
    #[serde(alias = "text", alias = "topic")]
    title: String,
}

/// Topic id to official topic text, in file order
#[derive(Debug, Clone, Default)]
pub struct TopicSet {
    topics: Vec<(TopicId, String)>,
    index: HashMap<String, usize>,
}

impl TopicSet {
    /// Parse a topic file; each line is `id<TAB>text` or `{"id": .., "title": ..}`
    pub fn parse(source: &str) -> Result<Self> {
        let mut set = Self::default();
        for (idx, line) in source.lines().enumerate() {
            let line_no = idx + 1;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            let (id, text) = if line.trim_start().starts_with('{') {
                let topic: JsonTopic = serde_json::from_str(line)
                    .map_err(|e| Error::topic_file(line_no, e.to_string()))?;
                (topic.id, topic.title)
            } else {
                let (id, text) = line
                    .split_once('\t')
                    .ok_or_else(|| Error::topic_file(line_no, "expected <id>\\t<text>"))?;
                (TopicId::from(id.trim()), text.trim().to_string())
            };
            set.insert(id, text);
        }
        Ok(set)
    }

    /// Load a topic file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let set = Self::parse(&source)?;
        tracing::info!(path = %path.display(), topics = set.len(), "Loaded topics");
        Ok(set)
    }

    /// Add or replace a topic
    pub fn insert(&mut self, id: TopicId, text: impl Into<String>) {
        let key = id.key();
        match self.index.get(&key) {
            Some(&pos) => self.topics[pos] = (id, text.into()),
            None => {
                self.index.insert(key, self.topics.len());
                self.topics.push((id, text.into()));
            }
        }
    }

    /// Official text for a topic id; `"5"` and `5` name the same topic
    pub fn get(&self, id: &TopicId) -> Option<&str> {
        self.index
            .get(&id.key())
            .map(|&pos| self.topics[pos].1.as_str())
    }

    pub fn contains(&self, id: &TopicId) -> bool {
        self.index.contains_key(&id.key())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TopicId, &str)> {
        self.topics.iter().map(|(id, text)| (id, text.as_str()))
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}
