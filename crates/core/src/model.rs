//! Trace Domain Model
//!
//! Symptoms, causal chains, and suggestions as produced by the pipeline
//! stages. Model output is untrusted: the closed vocabularies below reject
//! anything outside the expected sets at deserialization time, and the
//! `validate`/`prepare_*` functions enforce the structural invariants before
//! any value leaves a stage.
//!
//! Field names serialize in camelCase because the same shapes are requested
//! from the model and streamed to callers.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Number of chains a deep trace must produce.
pub const DEEP_CHAIN_COUNT: RangeInclusive<usize> = 2..=4;

/// Number of suggestions a completed trace carries.
pub const SUGGESTION_COUNT: RangeInclusive<usize> = 3..=6;

/// Hard cap on model turns in the chain builder's tool loop.
pub const MAX_TOOL_TURNS: u32 = 5;

// ============================================================================
// Vocabularies
// ============================================================================

/// Body system tag (closed set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodySystem {
    #[serde(alias = "pulmonary")]
    Respiratory,
    #[serde(alias = "cardiovascular", alias = "hematologic", alias = "hematological")]
    Circulatory,
    Musculoskeletal,
    #[serde(alias = "neurologic", alias = "nervous")]
    Neurological,
    #[serde(alias = "kidney")]
    Renal,
    Immune,
    #[serde(alias = "digestive")]
    Gastrointestinal,
    #[serde(alias = "skin", alias = "dermatological")]
    Integumentary,
    Endocrine,
}

impl std::fmt::Display for BodySystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BodySystem::Respiratory => "respiratory",
            BodySystem::Circulatory => "circulatory",
            BodySystem::Musculoskeletal => "musculoskeletal",
            BodySystem::Neurological => "neurological",
            BodySystem::Renal => "renal",
            BodySystem::Immune => "immune",
            BodySystem::Gastrointestinal => "gastrointestinal",
            BodySystem::Integumentary => "integumentary",
            BodySystem::Endocrine => "endocrine",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemporalPattern {
    Acute,
    Gradual,
    Recurring,
}

/// Position of a node along a causal path.
///
/// Declaration order is path order, so the derived `Ord` gives
/// symptom < mechanism < root-cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    Symptom,
    Mechanism,
    #[serde(alias = "root_cause")]
    RootCause,
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeType::Symptom => write!(f, "symptom"),
            NodeType::Mechanism => write!(f, "mechanism"),
            NodeType::RootCause => write!(f, "root-cause"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStrength {
    Strong,
    Moderate,
    Possible,
}

/// Suggestion triage level. Declaration order is display order (urgent first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Urgent,
    Discuss,
    Info,
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Urgency::Urgent => write!(f, "urgent"),
            Urgency::Discuss => write!(f, "discuss"),
            Urgency::Info => write!(f, "info"),
        }
    }
}

// ============================================================================
// Symptoms
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedSymptom {
    pub id: String,
    /// Verbatim or close paraphrase of what the patient said
    pub text: String,
    pub body_system: BodySystem,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporal_marker: Option<String>,
    #[serde(default)]
    pub is_new_onset: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymptomAnalysis {
    pub symptoms: Vec<ParsedSymptom>,
    #[serde(default)]
    pub environmental_factors: Vec<String>,
    /// Absent only for quick traces, which skip symptom parsing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporal_pattern: Option<TemporalPattern>,
    /// Original input, kept for audit. Always overwritten with the caller's
    /// text, never trusted from the model.
    #[serde(default)]
    pub raw_input: String,
}

impl SymptomAnalysis {
    /// Analysis placeholder for pipelines that do not parse symptoms.
    pub fn unparsed(raw_input: impl Into<String>) -> Self {
        Self {
            symptoms: Vec::new(),
            environmental_factors: Vec::new(),
            temporal_pattern: None,
            raw_input: raw_input.into(),
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.symptoms.is_empty() {
            return Err(CoreError::validation("no symptoms were identified"));
        }
        if self.temporal_pattern.is_none() {
            return Err(CoreError::validation("missing temporalPattern"));
        }
        let mut seen = std::collections::HashSet::new();
        for symptom in &self.symptoms {
            if symptom.id.trim().is_empty() || symptom.text.trim().is_empty() {
                return Err(CoreError::validation("symptom with empty id or text"));
            }
            if !seen.insert(symptom.id.as_str()) {
                return Err(CoreError::validation(format!(
                    "duplicate symptom id '{}'",
                    symptom.id
                )));
            }
        }
        Ok(())
    }

    /// Comma-joined symptom texts, used for archive titles.
    pub fn headline(&self) -> String {
        if self.symptoms.is_empty() {
            return self.raw_input.clone();
        }
        self.symptoms
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ============================================================================
// Causal chains
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub title: String,
    pub description: String,
    pub body_system: BodySystem,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_evidence: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConnection {
    pub from_node_id: String,
    pub to_node_id: String,
    pub mechanism: String,
    pub strength: ConnectionStrength,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CausalChain {
    pub id: String,
    pub label: String,
    pub overall_confidence: f64,
    pub nodes: Vec<ChainNode>,
    #[serde(default)]
    pub connections: Vec<ChainConnection>,
}

fn check_confidence(value: f64, what: &str) -> CoreResult<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(CoreError::validation(format!(
            "{} confidence {} is outside [0, 1]",
            what, value
        )))
    }
}

impl CausalChain {
    fn node_index(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    /// Flip connections emitted against path order (root-cause towards
    /// symptom) so every connection points from a node to its successor.
    pub fn normalize_connections(&mut self) {
        let positions: Vec<(Option<usize>, Option<usize>)> = self
            .connections
            .iter()
            .map(|c| (self.node_index(&c.from_node_id), self.node_index(&c.to_node_id)))
            .collect();

        for (conn, (from, to)) in self.connections.iter_mut().zip(positions) {
            if let (Some(from), Some(to)) = (from, to) {
                if from > to {
                    std::mem::swap(&mut conn.from_node_id, &mut conn.to_node_id);
                }
            }
        }
    }

    /// Check the path invariants:
    /// - at least a symptom and a root cause
    /// - node types non-decreasing, first is a symptom, last is the only root cause
    /// - every connection joins a node to its immediate successor
    /// - every non-terminal node has an outgoing connection
    pub fn validate(&self) -> CoreResult<()> {
        check_confidence(self.overall_confidence, "overall")?;

        if self.nodes.len() < 2 {
            return Err(CoreError::validation(
                "a chain needs at least a symptom and a root cause",
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for node in &self.nodes {
            if node.id.trim().is_empty() {
                return Err(CoreError::validation("node with empty id"));
            }
            if !seen.insert(node.id.as_str()) {
                return Err(CoreError::validation(format!("duplicate node id '{}'", node.id)));
            }
            check_confidence(node.confidence, &format!("node '{}'", node.id))?;
        }

        let first = &self.nodes[0];
        if first.node_type != NodeType::Symptom {
            return Err(CoreError::validation(format!(
                "chain must start at a symptom, found {}",
                first.node_type
            )));
        }
        let last = &self.nodes[self.nodes.len() - 1];
        if last.node_type != NodeType::RootCause {
            return Err(CoreError::validation(format!(
                "chain must end at a root-cause, found {}",
                last.node_type
            )));
        }
        for pair in self.nodes.windows(2) {
            if pair[1].node_type < pair[0].node_type {
                return Err(CoreError::validation(format!(
                    "node '{}' ({}) follows '{}' ({})",
                    pair[1].id, pair[1].node_type, pair[0].id, pair[0].node_type
                )));
            }
        }
        let root_causes = self
            .nodes
            .iter()
            .filter(|n| n.node_type == NodeType::RootCause)
            .count();
        if root_causes != 1 {
            return Err(CoreError::validation(format!(
                "chain must have exactly one root-cause, found {}",
                root_causes
            )));
        }

        let mut linked = vec![false; self.nodes.len() - 1];
        for conn in &self.connections {
            let from = self.node_index(&conn.from_node_id).ok_or_else(|| {
                CoreError::validation(format!("connection from unknown node '{}'", conn.from_node_id))
            })?;
            let to = self.node_index(&conn.to_node_id).ok_or_else(|| {
                CoreError::validation(format!("connection to unknown node '{}'", conn.to_node_id))
            })?;
            if to != from + 1 {
                return Err(CoreError::validation(format!(
                    "connection '{}' -> '{}' does not follow the path",
                    conn.from_node_id, conn.to_node_id
                )));
            }
            linked[from] = true;
        }
        if let Some(gap) = linked.iter().position(|l| !l) {
            return Err(CoreError::validation(format!(
                "node '{}' has no connection to its successor",
                self.nodes[gap].id
            )));
        }

        Ok(())
    }
}

/// Repair, validate, order, and bound a list of chains.
///
/// Chains are sorted by descending overall confidence; anything beyond
/// `count.end()` is dropped, fewer than `count.start()` is an error.
pub fn prepare_chains(
    mut chains: Vec<CausalChain>,
    count: RangeInclusive<usize>,
) -> CoreResult<Vec<CausalChain>> {
    for chain in &mut chains {
        chain.normalize_connections();
        chain
            .validate()
            .map_err(|e| CoreError::validation(format!("chain '{}': {}", chain.id, e)))?;
    }

    if chains.len() < *count.start() {
        return Err(CoreError::validation(format!(
            "expected at least {} chain(s), got {}",
            count.start(),
            chains.len()
        )));
    }

    chains.sort_by(|a, b| b.overall_confidence.total_cmp(&a.overall_confidence));
    chains.truncate(*count.end());
    Ok(chains)
}

// ============================================================================
// Suggestions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub text: String,
    pub for_doctor: bool,
    pub urgency: Urgency,
}

/// Order suggestions urgent-first and enforce the count and audience rules.
///
/// The sort is stable so the model's ordering within an urgency level is
/// kept. When trimming to `count.end()` would drop every doctor-facing item,
/// the first doctor-facing item from the dropped tail replaces the last kept
/// one, which preserves the urgency order.
pub fn prepare_suggestions(
    mut suggestions: Vec<Suggestion>,
    count: RangeInclusive<usize>,
) -> CoreResult<Vec<Suggestion>> {
    if suggestions.iter().any(|s| s.text.trim().is_empty()) {
        return Err(CoreError::validation("suggestion with empty text"));
    }
    if suggestions.len() < *count.start() {
        return Err(CoreError::validation(format!(
            "expected at least {} suggestions, got {}",
            count.start(),
            suggestions.len()
        )));
    }
    if !suggestions.iter().any(|s| s.for_doctor) {
        return Err(CoreError::validation(
            "at least one suggestion must be for the doctor",
        ));
    }

    suggestions.sort_by_key(|s| s.urgency);

    let max = *count.end();
    if suggestions.len() > max {
        let tail = suggestions.split_off(max);
        if !suggestions.iter().any(|s| s.for_doctor) {
            if let Some(doctor) = tail.into_iter().find(|s| s.for_doctor) {
                suggestions[max - 1] = doctor;
            }
        }
    }

    Ok(suggestions)
}

// ============================================================================
// Aggregate
// ============================================================================

/// Everything a completed trace produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceResult {
    pub symptoms: SymptomAnalysis,
    pub chains: Vec<CausalChain>,
    pub summary: String,
    pub suggestions: Vec<Suggestion>,
    /// Reasoning text accumulated across model turns, in turn order
    pub thinking: String,
}
