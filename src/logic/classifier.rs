//! Segment Classifier
//!
//! Pure mapping of (telemetry record, rule set) to a segment and the reason
//! it was chosen. No state is kept between calls.
//!
//! Evaluation order:
//! 1. start from [`DEFAULT_SEGMENT`]
//! 2. every entry of [`NAME_HINTS`] contained in the record's `name`
//!    (case-insensitive) overwrites the segment, last declared match wins
//! 3. every criterion of the rule set, in declared order, whose field the
//!    record carries as a number overwrites the segment with its first
//!    holding tier; a criterion with no holding tier leaves it untouched
//!
//! Later matches always overwrite earlier ones. The last criterion present in
//! both the rule set and the record decides the result.

use std::fmt;

use serde::Serialize;

use crate::models::{RuleSet, SegmentId, TelemetryRecord, DEFAULT_SEGMENT};

/// Name substrings mapped to segments, tested in this order
pub const NAME_HINTS: &[(&str, SegmentId)] = &[
    ("traffic", 40),
    ("environment", 20),
    ("security", 30),
];

// ============================================================================
// RESULT TYPES
// ============================================================================

/// What produced the final segment
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchSource {
    Default,
    NameHint {
        pattern: &'static str,
    },
    Criterion {
        field: String,
        level: String,
        threshold: f64,
        value: f64,
    },
}

impl fmt::Display for MatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchSource::Default => write!(f, "no rule matched, default segment"),
            MatchSource::NameHint { pattern } => write!(f, "device name contains '{}'", pattern),
            MatchSource::Criterion { field, level, threshold, value } if value >= threshold => {
                write!(f, "{} = {} reached '{}' threshold {}", field, value, level, threshold)
            }
            MatchSource::Criterion { field, level, value, .. } => {
                write!(f, "{} = {} fell into catch-all '{}'", field, value, level)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub segment: SegmentId,
    pub source: MatchSource,
}

impl Classification {
    /// Human readable reason for the assignment
    pub fn rationale(&self) -> String {
        format!("{} -> VLAN {}", self.source, self.segment)
    }
}

// ============================================================================
// MAIN CLASSIFICATION FUNCTION
// ============================================================================

/// Classify one telemetry record against a rule set snapshot
pub fn classify(record: &TelemetryRecord, rules: &RuleSet) -> Classification {
    let mut result = Classification {
        segment: DEFAULT_SEGMENT,
        source: MatchSource::Default,
    };

    if let Some(name) = record.name() {
        let name = name.to_lowercase();
        for &(pattern, segment) in NAME_HINTS {
            if name.contains(pattern) {
                result = Classification {
                    segment,
                    source: MatchSource::NameHint { pattern },
                };
            }
        }
    }

    for criterion in &rules.criteria {
        // Missing or non-numeric fields skip this criterion only
        let Some(value) = record.field(&criterion.field).and_then(|v| v.as_number()) else {
            continue;
        };
        let Some(tier) = criterion.first_match(value) else {
            continue;
        };

        result = Classification {
            segment: tier.segment,
            source: MatchSource::Criterion {
                field: criterion.field.clone(),
                level: tier.level.clone(),
                threshold: tier.threshold,
                value,
            },
        };
    }

    result
}

// ============================================================================
// TESTS
// ============================================================================
