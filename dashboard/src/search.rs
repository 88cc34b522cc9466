use crate::errors::Result;
use crate::metrics::SEARCH_QUERIES_TOTAL;
use crate::model::KnowledgeEntry;
use std::path::Path;
use tracing::{debug, info};

/// Knowledge base compiled into the binary
const BUNDLED_KNOWLEDGE_BASE: &str = include_str!("../data/knowledge_base.json");

/// Queries of this many characters or fewer return nothing.
pub const MIN_QUERY_CHARS: usize = 2;

/// Linear substring search over a fixed knowledge base.
///
/// The searchable fields are lowercased once at load time; each query is a
/// full scan, which is fine for a few hundred entries.
#[derive(Debug, Clone)]
pub struct KnowledgeIndex {
    entries: Vec<KnowledgeEntry>,
    haystacks: Vec<[String; 3]>,
}

impl KnowledgeIndex {
    pub fn new(entries: Vec<KnowledgeEntry>) -> Self {
        let haystacks = entries
            .iter()
            .map(|e| {
                [
                    e.condition_name.to_lowercase(),
                    e.symptoms.to_lowercase(),
                    e.cause.to_lowercase(),
                ]
            })
            .collect();

        Self { entries, haystacks }
    }

    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_KNOWLEDGE_BASE)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<KnowledgeEntry> = serde_json::from_str(json)?;
        Ok(Self::new(entries))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let index = Self::from_json(&json)?;
        info!(
            "Loaded {} knowledge base entries from {}",
            index.len(),
            path.display()
        );
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose condition name, symptoms or cause contain `query`,
    /// ignoring case, in knowledge base order.
    pub fn search(&self, query: &str) -> Vec<&KnowledgeEntry> {
        if query.chars().count() <= MIN_QUERY_CHARS {
            return Vec::new();
        }
        SEARCH_QUERIES_TOTAL.inc();

        let needle = query.to_lowercase();
        let hits: Vec<&KnowledgeEntry> = self
            .entries
            .iter()
            .zip(&self.haystacks)
            .filter(|(_, fields)| fields.iter().any(|f| f.contains(&needle)))
            .map(|(entry, _)| entry)
            .collect();

        debug!("Search {:?} matched {} entries", query, hits.len());
        hits
    }
}
