//! Rule set model
//!
//! Wire form (key order is evaluation order):
//!
//! ```json
//! {
//!   "temperature": {
//!     "high":   { "threshold": 30, "vlan": 10 },
//!     "medium": { "threshold": 20, "vlan": 20 },
//!     "low":    { "threshold": 0,  "vlan": 30 }
//!   }
//! }
//! ```
//!
//! Decoding never fails. Anything that is not an object decodes to an empty
//! rule set and tiers with unusable numbers are dropped.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Logical network segment ("VLAN") tag
pub type SegmentId = u32;

/// Segment assigned when nothing else matches
pub const DEFAULT_SEGMENT: SegmentId = 100;

// ============================================================================
// TIER
// ============================================================================

/// One (threshold, segment) step of a criterion
#[derive(Debug, Clone, PartialEq)]
pub struct Tier {
    pub level: String,
    pub threshold: f64,
    pub segment: SegmentId,
}

impl Tier {
    pub fn new(level: impl Into<String>, threshold: f64, segment: SegmentId) -> Self {
        Self {
            level: level.into(),
            threshold,
            segment,
        }
    }

    /// Holds when the value reaches the threshold. A zero threshold is a
    /// catch-all and holds for any value.
    pub fn holds(&self, value: f64) -> bool {
        self.is_catch_all() || value >= self.threshold
    }

    pub fn is_catch_all(&self) -> bool {
        self.threshold == 0.0
    }

    fn from_value(level: &str, value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let threshold = lenient_number(object.get("threshold")?)?;
        let segment = lenient_segment(object.get("vlan")?)?;
        Some(Self::new(level, threshold, segment))
    }

    fn to_value(&self) -> Value {
        let mut object = Map::new();
        object.insert("threshold".to_string(), number_value(self.threshold));
        object.insert("vlan".to_string(), Value::from(self.segment));
        Value::Object(object)
    }
}

// ============================================================================
// CRITERION
// ============================================================================

/// Threshold tiers applied to one named telemetry field
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    pub field: String,
    pub tiers: Vec<Tier>,
}

impl Criterion {
    pub fn new(field: impl Into<String>, tiers: Vec<Tier>) -> Self {
        Self {
            field: field.into(),
            tiers,
        }
    }

    /// First tier, in declared order, whose threshold the value reaches
    pub fn first_match(&self, value: f64) -> Option<&Tier> {
        self.tiers.iter().find(|tier| tier.holds(value))
    }

    fn from_value(field: &str, value: &Value) -> Self {
        let tiers: Vec<Tier> = match value {
            Value::Object(levels) => levels
                .iter()
                .filter_map(|(level, tier)| {
                    let parsed = Tier::from_value(level, tier);
                    if parsed.is_none() {
                        tracing::warn!("Skipping malformed tier '{}' of criterion '{}'", level, field);
                    }
                    parsed
                })
                .collect(),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .filter_map(|(index, tier)| {
                    let level = tier
                        .get("level")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| index.to_string());
                    let parsed = Tier::from_value(&level, tier);
                    if parsed.is_none() {
                        tracing::warn!("Skipping malformed tier #{} of criterion '{}'", index, field);
                    }
                    parsed
                })
                .collect(),
            _ => {
                tracing::warn!("Criterion '{}' has no tier table", field);
                Vec::new()
            }
        };

        Self::new(field, tiers)
    }

    fn to_value(&self) -> Value {
        let levels: Map<String, Value> = self
            .tiers
            .iter()
            .map(|tier| (tier.level.clone(), tier.to_value()))
            .collect();
        Value::Object(levels)
    }
}

// ============================================================================
// RULE SET
// ============================================================================

/// Ordered collection of criteria currently in effect
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    pub criteria: Vec<Criterion>,
}

impl RuleSet {
    pub fn new(criteria: Vec<Criterion>) -> Self {
        Self { criteria }
    }

    /// Degenerate but valid: only the default segment and name hints apply
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Total decoding from the wire form
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            tracing::warn!("Rule set is not a JSON object, using an empty rule set");
            return Self::empty();
        };

        Self::new(
            object
                .iter()
                .map(|(field, tiers)| Criterion::from_value(field, tiers))
                .collect(),
        )
    }

    pub fn to_value(&self) -> Value {
        let criteria: Map<String, Value> = self
            .criteria
            .iter()
            .map(|criterion| (criterion.field.clone(), criterion.to_value()))
            .collect();
        Value::Object(criteria)
    }
}

impl Default for RuleSet {
    /// Built-in smart city rules
    fn default() -> Self {
        Self::new(vec![
            Criterion::new("temperature", vec![
                Tier::new("high", 30.0, 10),
                Tier::new("medium", 20.0, 20),
                Tier::new("low", 0.0, 30),
            ]),
            Criterion::new("traffic", vec![
                Tier::new("high", 80.0, 40),
                Tier::new("medium", 50.0, 50),
                Tier::new("low", 0.0, 60),
            ]),
            Criterion::new("airQuality", vec![
                Tier::new("high", 150.0, 70),
                Tier::new("medium", 100.0, 80),
                Tier::new("low", 0.0, 90),
            ]),
        ])
    }
}

impl Serialize for RuleSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RuleSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Numbers, or strings holding a finite number
fn lenient_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

fn lenient_segment(value: &Value) -> Option<SegmentId> {
    match value {
        Value::Number(n) => match n.as_u64() {
            Some(id) => SegmentId::try_from(id).ok(),
            None => {
                let f = n.as_f64()?;
                (f >= 0.0 && f.fract() == 0.0 && f <= SegmentId::MAX as f64).then(|| f as SegmentId)
            }
        },
        Value::String(s) => s.trim().parse::<SegmentId>().ok(),
        _ => None,
    }
}

/// Whole thresholds go back out as integers
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_declared_order_is_kept() {
        let rules = RuleSet::from_value(&json!({
            "traffic": { "low": { "threshold": 0, "vlan": 60 }, "high": { "threshold": 80, "vlan": 40 } },
            "airQuality": { "high": { "threshold": 150, "vlan": 70 } },
        }));

        let fields: Vec<&str> = rules.criteria.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["traffic", "airQuality"]);

        let levels: Vec<&str> = rules.criteria[0].tiers.iter().map(|t| t.level.as_str()).collect();
        assert_eq!(levels, vec!["low", "high"]);
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let rules = RuleSet::from_value(&json!({
            "humidity": { "wet": { "threshold": "70.5", "vlan": "11" } }
        }));
        assert_eq!(rules.criteria[0].tiers, vec![Tier::new("wet", 70.5, 11)]);
    }

    #[test]
    fn test_malformed_tiers_are_skipped() {
        let rules = RuleSet::from_value(&json!({
            "noise": {
                "bad_threshold": { "threshold": "loud", "vlan": 12 },
                "bad_vlan": { "threshold": 40, "vlan": -3 },
                "missing": { "vlan": 13 },
                "ok": { "threshold": 10, "vlan": 14 }
            },
            "broken": 42
        }));

        assert_eq!(rules.criteria.len(), 2);
        assert_eq!(rules.criteria[0].tiers, vec![Tier::new("ok", 10.0, 14)]);
        assert!(rules.criteria[1].tiers.is_empty());
    }

    #[test]
    fn test_array_tiers_are_accepted() {
        let rules = RuleSet::from_value(&json!({
            "speed": [
                { "level": "fast", "threshold": 100, "vlan": 5 },
                { "threshold": 0, "vlan": 6 }
            ]
        }));
        assert_eq!(rules.criteria[0].tiers, vec![
            Tier::new("fast", 100.0, 5),
            Tier::new("1", 0.0, 6),
        ]);
    }

    #[test]
    fn test_non_object_is_empty_rule_set() {
        assert!(RuleSet::from_value(&json!([1, 2, 3])).is_empty());
        assert!(RuleSet::from_value(&json!(null)).is_empty());
        assert!(RuleSet::from_value(&json!({})).is_empty());
    }

    #[test]
    fn test_wire_form_matches_dashboard_shape() {
        let value = serde_json::to_value(RuleSet::default()).unwrap();
        assert_eq!(value["temperature"]["medium"], json!({ "threshold": 20, "vlan": 20 }));
        assert_eq!(value["airQuality"]["high"], json!({ "threshold": 150, "vlan": 70 }));

        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["temperature", "traffic", "airQuality"]);

        let decoded: RuleSet = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, RuleSet::default());
    }

    #[test]
    fn test_first_match_walks_in_order() {
        let criterion = Criterion::new("temperature", vec![
            Tier::new("high", 30.0, 10),
            Tier::new("medium", 20.0, 20),
            Tier::new("low", 0.0, 30),
        ]);

        assert_eq!(criterion.first_match(25.0).map(|t| t.segment), Some(20));
        assert_eq!(criterion.first_match(35.0).map(|t| t.segment), Some(10));
        assert_eq!(criterion.first_match(20.0).map(|t| t.segment), Some(20));
        assert_eq!(criterion.first_match(-5.0).map(|t| t.segment), Some(30));
        assert_eq!(Criterion::new("empty", vec![]).first_match(1.0), None);
    }

    #[test]
    fn test_value_below_nonzero_thresholds_matches_nothing() {
        let loud = Criterion::new("noise", vec![Tier::new("loud", 80.0, 12)]);
        assert_eq!(loud.first_match(10.0), None);
        assert_eq!(loud.first_match(80.0).map(|t| t.segment), Some(12));

        let traffic = Criterion::new("traffic", vec![
            Tier::new("high", 80.0, 40),
            Tier::new("medium", 50.0, 50),
            Tier::new("low", 10.0, 60),
        ]);
        assert_eq!(traffic.first_match(55.0).map(|t| t.segment), Some(50));
        assert_eq!(traffic.first_match(3.0), None);
    }

    #[test]
    fn test_zero_threshold_is_catch_all() {
        let tier = Tier::new("any", 0.0, 7);
        assert!(tier.is_catch_all());
        assert!(tier.holds(-40.0));
        assert!(!Tier::new("cold", -10.0, 8).holds(-40.0));
    }
}
