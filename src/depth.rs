//! Research depth levels and the per-depth tuning table.

use std::fmt;
use std::str::FromStr;

use lodestar_search::GatherLimits;
use serde::{Deserialize, Serialize};

/// How deep a research run goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Depth {
    Beginner,
    #[default]
    Intermediate,
    Expert,
}

/// Writing guidance handed to the report writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WritingStyle {
    pub explanation_style: &'static str,
    pub technical_terms: &'static str,
    pub detail_level: &'static str,
    pub examples: &'static str,
    pub structure: &'static str,
}

/// Tuning values for one depth level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthProfile {
    pub min_questions: usize,
    pub target_questions: usize,
    pub max_questions: usize,
    pub sources_per_query: usize,
    pub content_chars: usize,
    pub style: WritingStyle,
}

impl DepthProfile {
    /// Retrieval limits for one sub-question at this depth.
    pub fn gather_limits(&self) -> GatherLimits {
        GatherLimits {
            max_sources: self.sources_per_query,
            content_chars: self.content_chars,
        }
    }
}

const BEGINNER: DepthProfile = DepthProfile {
    min_questions: 3,
    target_questions: 4,
    max_questions: 5,
    sources_per_query: 5,
    content_chars: 600,
    style: WritingStyle {
        explanation_style: "simple and clear",
        technical_terms: "minimal, with definitions",
        detail_level: "basic concepts and overview",
        examples: "lots of practical examples",
        structure: "step-by-step explanations",
    },
};

const INTERMEDIATE: DepthProfile = DepthProfile {
    min_questions: 4,
    target_questions: 6,
    max_questions: 8,
    sources_per_query: 6,
    content_chars: 800,
    style: WritingStyle {
        explanation_style: "balanced technical and accessible",
        technical_terms: "moderate, assume some knowledge",
        detail_level: "detailed with some technical depth",
        examples: "practical and theoretical examples",
        structure: "organized sections with depth",
    },
};

const EXPERT: DepthProfile = DepthProfile {
    min_questions: 6,
    target_questions: 8,
    max_questions: 10,
    sources_per_query: 7,
    content_chars: 1000,
    style: WritingStyle {
        explanation_style: "technical and comprehensive",
        technical_terms: "full technical vocabulary",
        detail_level: "deep analysis and advanced concepts",
        examples: "complex real-world applications",
        structure: "detailed analysis with citations",
    },
};

impl Depth {
    pub fn profile(self) -> DepthProfile {
        match self {
            Self::Beginner => BEGINNER,
            Self::Intermediate => INTERMEDIATE,
            Self::Expert => EXPERT,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Expert => "expert",
        }
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Depth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "expert" => Ok(Self::Expert),
            other => Err(format!(
                "unknown depth '{other}' (expected beginner, intermediate or expert)"
            )),
        }
    }
}
