//! Configuration for the attribution engine

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::generation::{CitationMode, PromptMode};

/// MS MARCO v2.1 segment id, e.g. `msmarco_v2.1_doc_04_420132660#5_814560531`
pub const MSMARCO_SEGMENT_PATTERN: &str = r"^msmarco_v2\.1_doc_\d+_\d+#\d+_\d+$";

/// Main engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// Prompt budget configuration
    #[serde(default)]
    pub budget: BudgetConfig,
    /// Prompt template configuration
    #[serde(default)]
    pub prompt: PromptConfig,
    /// Citation extraction configuration
    #[serde(default)]
    pub citations: CitationConfig,
    /// Output contract enforced by the validator
    #[serde(default)]
    pub compliance: ComplianceConfig,
    /// Generator backend profile
    #[serde(default)]
    pub generator: GeneratorProfile,
}

impl EngineConfig {
    /// Parse a TOML document; missing sections fall back to defaults
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&source)
    }

    /// Reject settings the engine cannot honor
    pub fn validate(&self) -> Result<()> {
        self.budget.validate()?;
        self.compliance.validate()?;
        if self.citations.max_per_sentence == 0 {
            return Err(Error::config("citations.max_per_sentence must be at least 1"));
        }
        Ok(())
    }
}

/// Context window budget for prompt construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Model context window (tokens)
    #[serde(default = "default_context_size")]
    pub context_size: usize,
    /// Tokens kept free for the generated answer
    #[serde(default = "default_reserved_output_tokens")]
    pub reserved_output_tokens: usize,
    /// Words set aside for instructions and the query when sizing snippets
    #[serde(default = "default_fixed_overhead")]
    pub fixed_overhead: usize,
    /// Number of ranked candidates offered to the generator
    #[serde(default = "default_topk")]
    pub topk: usize,
}

fn default_context_size() -> usize { 8192 }
fn default_reserved_output_tokens() -> usize { 1500 }
fn default_fixed_overhead() -> usize { 200 }
fn default_topk() -> usize { 20 }

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            context_size: 8192,
            reserved_output_tokens: 1500,
            fixed_overhead: 200,
            topk: 20,
        }
    }
}

impl BudgetConfig {
    /// Tokens available to the prompt
    pub fn prompt_budget(&self) -> usize {
        self.context_size.saturating_sub(self.reserved_output_tokens)
    }

    fn validate(&self) -> Result<()> {
        if self.context_size <= self.reserved_output_tokens {
            return Err(Error::config(format!(
                "budget.context_size ({}) must exceed budget.reserved_output_tokens ({})",
                self.context_size, self.reserved_output_tokens
            )));
        }
        if self.topk == 0 {
            return Err(Error::config("budget.topk must be at least 1"));
        }
        Ok(())
    }
}

/// Prompt template selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Instruction set
    #[serde(default)]
    pub mode: PromptMode,
    /// Replaces the mode's default system message
    #[serde(default)]
    pub system_message: Option<String>,
}

/// Citation extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationConfig {
    /// Citations kept per sentence, in relevance order
    #[serde(default = "default_max_per_sentence")]
    pub max_per_sentence: usize,
}

fn default_max_per_sentence() -> usize { 3 }

impl Default for CitationConfig {
    fn default() -> Self {
        Self { max_per_sentence: 3 }
    }
}

/// Output contract limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceConfig {
    /// Maximum answer length in words
    #[serde(default = "default_response_limit")]
    pub response_limit: usize,
    /// Maximum number of references
    #[serde(default = "default_reference_limit")]
    pub reference_limit: usize,
    /// Pattern every reference id should match
    #[serde(default = "default_reference_pattern")]
    pub reference_pattern: String,
    /// Apply repairs for warnings
    #[serde(default = "default_repair")]
    pub repair: bool,
    /// Every record in a run must carry the same `run_id`
    #[serde(default = "default_require_run_id_consistency")]
    pub require_run_id_consistency: bool,
    /// Record layout the run must follow
    #[serde(default)]
    pub schema: RunSchema,
    /// What sentence citations hold
    #[serde(default)]
    pub citation_format: CitationFormat,
}

/// Run file record layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunSchema {
    /// Top-level `run_id`, `topic_id`, `topic` and `response_length`
    #[default]
    Trec24,
    /// `metadata` object with `team_id`, `run_id`, `narrative_id`
    Trec25,
}

/// Citation encoding inside `answer[i].citations`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationFormat {
    /// Integer positions in `references`
    #[default]
    Index,
    /// Segment ids that must appear in `references`
    SegmentId,
}

fn default_response_limit() -> usize { 400 }
fn default_reference_limit() -> usize { 20 }
fn default_reference_pattern() -> String { MSMARCO_SEGMENT_PATTERN.to_string() }
fn default_repair() -> bool { true }
fn default_require_run_id_consistency() -> bool { true }

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            response_limit: 400,
            reference_limit: 20,
            reference_pattern: MSMARCO_SEGMENT_PATTERN.to_string(),
            repair: true,
            require_run_id_consistency: true,
            schema: RunSchema::Trec24,
            citation_format: CitationFormat::Index,
        }
    }
}

impl ComplianceConfig {
    fn validate(&self) -> Result<()> {
        if self.response_limit == 0 {
            return Err(Error::config("compliance.response_limit must be at least 1"));
        }
        if self.reference_limit == 0 {
            return Err(Error::config("compliance.reference_limit must be at least 1"));
        }
        regex::Regex::new(&self.reference_pattern)?;
        Ok(())
    }
}

/// Generator backend description, passed explicitly into each call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorProfile {
    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,
    /// How the backend reports citations
    #[serde(default)]
    pub citation_mode: CitationMode,
}

fn default_model() -> String { "gpt-4o".to_string() }

impl Default for GeneratorProfile {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            citation_mode: CitationMode::Marker,
        }
    }
}
