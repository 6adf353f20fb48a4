//! Ingestion Coordinator
//!
//! Sole writer of the device and assignment registries and sole replacer of
//! the rule set. Both execution contexts (the async ingest worker and the
//! HTTP handlers) go through it.
//!
//! Writers are serialized by one coordinator-wide mutex. A telemetry update
//! therefore either completes before a rule replacement (and is then
//! reclassified by the pass) or starts after it (and uses the new rules).
//! Readers only take a registry read lock for the duration of a copy.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::IngestError;
use crate::models::{
    AssignmentRecord, DeviceDataRow, DeviceEntry, RuleSet, SegmentId, TelemetryRecord,
};
use super::classifier::classify;
use super::ingest::parse_payload;
use super::registry::Registry;
use super::rule_store::RuleStore;
use super::sink::{AssignmentSink, NullSink};

/// Result of feeding one telemetry message
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Accepted {
        device: DeviceEntry,
        assignment: AssignmentRecord,
    },
    Dropped(IngestError),
}

impl IngestOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, IngestOutcome::Accepted { .. })
    }

    pub fn assignment(&self) -> Option<&AssignmentRecord> {
        match self {
            IngestOutcome::Accepted { assignment, .. } => Some(assignment),
            IngestOutcome::Dropped(_) => None,
        }
    }
}

/// Result of a rule set replacement
#[derive(Debug, Clone)]
pub struct RuleUpdate {
    pub rules: Arc<RuleSet>,
    pub version: u64,
    pub reclassified: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorStats {
    pub devices: usize,
    pub assignments: usize,
    pub rules_version: u64,
    /// Devices per segment
    pub segments: BTreeMap<SegmentId, usize>,
}

pub struct Coordinator {
    rules: RuleStore,
    devices: Registry<DeviceEntry>,
    assignments: Registry<AssignmentRecord>,
    sink: Arc<dyn AssignmentSink>,
    write_lock: Mutex<()>,
}

impl Coordinator {
    /// Built-in rule set, given sink
    pub fn new(sink: Arc<dyn AssignmentSink>) -> Self {
        Self::with_rules(RuleSet::default(), sink)
    }

    pub fn with_rules(rules: RuleSet, sink: Arc<dyn AssignmentSink>) -> Self {
        Self {
            rules: RuleStore::new(rules),
            devices: Registry::new(),
            assignments: Registry::new(),
            sink,
            write_lock: Mutex::new(()),
        }
    }

    // ========================================================================
    // WRITE PATH
    // ========================================================================

    /// Register a record and classify it.
    ///
    /// A record without a usable device id is dropped and logged, both
    /// registries stay untouched.
    pub fn on_telemetry(&self, topic: &str, record: TelemetryRecord) -> IngestOutcome {
        if record.device_id.trim().is_empty() {
            tracing::warn!("Dropping telemetry on '{}': missing device_id", topic);
            return IngestOutcome::Dropped(IngestError::MissingDeviceId);
        }

        let _guard = self.write_lock.lock();
        let (rules, version) = self.rules.snapshot_versioned();
        let now = Utc::now();

        let classification = classify(&record, &rules);
        let assignment = AssignmentRecord {
            device_id: record.device_id.clone(),
            segment: classification.segment,
            timestamp: now,
            rationale: classification.rationale(),
            rules_version: version,
        };
        let row = DeviceDataRow::new(&record, classification.segment);
        let device = DeviceEntry {
            received_at: now,
            record,
            topic: topic.to_string(),
        };

        self.devices.upsert(assignment.device_id.clone(), device.clone());
        self.assignments.upsert(assignment.device_id.clone(), assignment.clone());
        self.sink.emit(row);

        tracing::debug!(
            "{} on '{}' assigned VLAN {} ({})",
            assignment.device_id, topic, assignment.segment, assignment.rationale
        );

        IngestOutcome::Accepted { device, assignment }
    }

    /// Parse a raw payload and feed it to [`Coordinator::on_telemetry`]
    pub fn ingest(&self, topic: &str, payload: &[u8]) -> IngestOutcome {
        match parse_payload(payload) {
            Ok(record) => self.on_telemetry(topic, record),
            Err(e) => {
                tracing::warn!("Dropping telemetry on '{}': {}", topic, e);
                IngestOutcome::Dropped(e)
            }
        }
    }

    /// Install a new rule set and reclassify every registered device.
    ///
    /// Returns once the assignment registry fully reflects the new rules.
    pub fn replace_rule_set(&self, rules: RuleSet) -> RuleUpdate {
        let _guard = self.write_lock.lock();

        if rules.is_empty() {
            tracing::warn!("Installing empty rule set, only defaults and name hints apply");
        }
        let version = self.rules.replace(rules);
        let rules = self.rules.snapshot();
        let reclassified = self.reclassify_locked(&rules, version);

        tracing::info!(
            "Rule set v{} installed ({} criteria), {} devices reclassified",
            version, rules.criteria.len(), reclassified
        );

        RuleUpdate { rules, version, reclassified }
    }

    /// Full classification pass against the current rule set
    pub fn reclassify_all(&self) -> usize {
        let _guard = self.write_lock.lock();
        let (rules, version) = self.rules.snapshot_versioned();
        self.reclassify_locked(&rules, version)
    }

    /// Caller must hold `write_lock`
    fn reclassify_locked(&self, rules: &RuleSet, version: u64) -> usize {
        if self.devices.is_empty() {
            return 0;
        }

        let now = Utc::now();
        let devices = self.devices.values();
        let mut assignments = HashMap::with_capacity(devices.len());
        let mut rows = Vec::with_capacity(devices.len());

        for entry in &devices {
            let classification = classify(&entry.record, rules);
            rows.push(DeviceDataRow::new(&entry.record, classification.segment));
            assignments.insert(entry.record.device_id.clone(), AssignmentRecord {
                device_id: entry.record.device_id.clone(),
                segment: classification.segment,
                timestamp: now,
                rationale: classification.rationale(),
                rules_version: version,
            });
        }

        let count = assignments.len();
        self.assignments.replace_all(assignments);
        for row in rows {
            self.sink.emit(row);
        }
        count
    }

    // ========================================================================
    // READ PATH
    // ========================================================================

    pub fn list_devices(&self) -> BTreeMap<String, DeviceEntry> {
        self.devices.list()
    }

    pub fn get_device(&self, device_id: &str) -> Option<DeviceEntry> {
        self.devices.get(device_id)
    }

    pub fn list_assignments(&self) -> BTreeMap<String, AssignmentRecord> {
        self.assignments.list()
    }

    /// Unknown devices are a normal outcome
    pub fn get_assignment(&self, device_id: &str) -> Option<AssignmentRecord> {
        self.assignments.get(device_id)
    }

    pub fn rule_set(&self) -> Arc<RuleSet> {
        self.rules.snapshot()
    }

    pub fn rules_version(&self) -> u64 {
        self.rules.version()
    }

    pub fn stats(&self) -> CoordinatorStats {
        let assignments = self.assignments.values();
        let mut segments = BTreeMap::new();
        for assignment in &assignments {
            *segments.entry(assignment.segment).or_insert(0) += 1;
        }

        CoordinatorStats {
            devices: self.devices.len(),
            assignments: assignments.len(),
            rules_version: self.rules.version(),
            segments,
        }
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(Arc::new(NullSink))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Criterion, Tier, DEFAULT_SEGMENT};

    /// Keeps every emitted row
    #[derive(Default)]
    struct RecordingSink {
        rows: Mutex<Vec<DeviceDataRow>>,
    }

    impl AssignmentSink for RecordingSink {
        fn emit(&self, row: DeviceDataRow) {
            self.rows.lock().push(row);
        }
    }

    fn temperature_only(tiers: Vec<Tier>) -> RuleSet {
        RuleSet::new(vec![Criterion::new("temperature", tiers)])
    }

    #[test]
    fn test_scenario_temperature_device() {
        let coordinator = Coordinator::default();
        let record = TelemetryRecord::new("d1").with_field("temperature", 22.0);

        let outcome = coordinator.on_telemetry("smartcity/sensor", record);
        assert!(outcome.is_accepted());
        assert_eq!(outcome.assignment().map(|a| a.segment), Some(20));

        let device = coordinator.get_device("d1").unwrap();
        assert_eq!(device.record.number_or("temperature", 0.0), 22.0);
        assert_eq!(device.topic, "smartcity/sensor");
        assert_eq!(coordinator.get_assignment("d1").unwrap().segment, 20);
    }

    #[test]
    fn test_scenario_name_hint_device() {
        let coordinator = Coordinator::default();
        coordinator.ingest("smartcity/traffic", br#"{"device_id":"d2","name":"TrafficSensor-07"}"#);
        assert_eq!(coordinator.get_assignment("d2").unwrap().segment, 40);
    }

    #[test]
    fn test_missing_device_id_leaves_registries_unchanged() {
        let coordinator = Coordinator::default();
        coordinator.ingest("smartcity/x", br#"{"device_id":"keep","temperature":5}"#);

        let outcome = coordinator.on_telemetry("smartcity/x", TelemetryRecord::new("  "));
        assert_eq!(outcome, IngestOutcome::Dropped(IngestError::MissingDeviceId));

        let outcome = coordinator.ingest("smartcity/x", br#"{"temperature":40}"#);
        assert_eq!(outcome, IngestOutcome::Dropped(IngestError::MissingDeviceId));

        let outcome = coordinator.ingest("smartcity/x", b"not json");
        assert!(matches!(outcome, IngestOutcome::Dropped(IngestError::MalformedJson(_))));

        assert_eq!(coordinator.list_devices().len(), 1);
        assert_eq!(coordinator.list_assignments().len(), 1);
        assert_eq!(coordinator.get_assignment("keep").unwrap().segment, 30);
    }

    #[test]
    fn test_latest_record_supersedes() {
        let coordinator = Coordinator::default();
        coordinator.ingest("t", br#"{"device_id":"d1","temperature":35,"location":"dock"}"#);
        coordinator.ingest("t", br#"{"device_id":"d1","temperature":5}"#);

        let device = coordinator.get_device("d1").unwrap();
        assert_eq!(device.record.field("location"), None);
        assert_eq!(coordinator.get_assignment("d1").unwrap().segment, 30);
    }

    #[test]
    fn test_replace_rule_set_reclassifies_every_device() {
        let coordinator = Coordinator::default();
        for (id, temp) in [("a", 35.0), ("b", 22.0), ("c", 3.0)] {
            coordinator.on_telemetry("t", TelemetryRecord::new(id).with_field("temperature", temp));
        }
        coordinator.on_telemetry("t", TelemetryRecord::new("n").with_field("name", "security cam"));

        let update = coordinator.replace_rule_set(temperature_only(vec![
            Tier::new("hot", 25.0, 7),
            Tier::new("cold", 0.0, 8),
        ]));
        assert_eq!(update.version, 2);
        assert_eq!(update.reclassified, 4);

        let assignments = coordinator.list_assignments();
        assert_eq!(assignments.len(), 4);
        assert!(assignments.values().all(|a| a.rules_version == 2));
        assert_eq!(assignments["a"].segment, 7);
        assert_eq!(assignments["b"].segment, 8);
        assert_eq!(assignments["c"].segment, 8);
        assert_eq!(assignments["n"].segment, 30);
    }

    #[test]
    fn test_empty_rule_set_is_accepted() {
        let coordinator = Coordinator::default();
        coordinator.on_telemetry("t", TelemetryRecord::new("a").with_field("temperature", 35.0));

        let update = coordinator.replace_rule_set(RuleSet::empty());
        assert!(update.rules.is_empty());
        assert_eq!(coordinator.get_assignment("a").unwrap().segment, DEFAULT_SEGMENT);
        assert!(coordinator.rule_set().is_empty());
    }

    #[test]
    fn test_replace_with_no_devices_reclassifies_nothing() {
        let coordinator = Coordinator::default();
        let update = coordinator.replace_rule_set(RuleSet::empty());
        assert_eq!(update.reclassified, 0);
        assert_eq!(coordinator.reclassify_all(), 0);
        assert!(coordinator.list_assignments().is_empty());
    }

    #[test]
    fn test_telemetry_after_replace_uses_new_rules() {
        let coordinator = Coordinator::default();
        coordinator.replace_rule_set(temperature_only(vec![Tier::new("any", 0.0, 99)]));

        let outcome = coordinator.on_telemetry("t", TelemetryRecord::new("a").with_field("temperature", 35.0));
        assert_eq!(outcome.assignment().map(|a| (a.segment, a.rules_version)), Some((99, 2)));
    }

    #[test]
    fn test_concurrent_telemetry_for_distinct_devices() {
        let coordinator = Coordinator::default();
        std::thread::scope(|scope| {
            for t in 0..8 {
                let coordinator = &coordinator;
                scope.spawn(move || {
                    for i in 0..50 {
                        let record = TelemetryRecord::new(format!("dev-{}-{}", t, i))
                            .with_field("traffic", f64::from(i));
                        coordinator.on_telemetry("smartcity/traffic", record);
                    }
                });
            }
        });

        let devices = coordinator.list_devices();
        assert_eq!(devices.len(), 400);
        assert_eq!(devices["dev-3-42"].record.number_or("traffic", -1.0), 42.0);
        assert_eq!(coordinator.list_assignments().len(), 400);
    }

    #[test]
    fn test_concurrent_replace_never_leaves_stale_assignments() {
        let coordinator = Coordinator::default();
        std::thread::scope(|scope| {
            let writer = &coordinator;
            scope.spawn(move || {
                for i in 0..200 {
                    let record = TelemetryRecord::new(format!("dev-{}", i % 20))
                        .with_field("temperature", f64::from(i % 40));
                    writer.on_telemetry("t", record);
                }
            });
            let admin = &coordinator;
            scope.spawn(move || {
                for segment in 1..=20 {
                    admin.replace_rule_set(temperature_only(vec![Tier::new("any", 0.0, segment)]));
                }
            });
        });

        let version = coordinator.rules_version();
        assert_eq!(version, 21);
        let assignments = coordinator.list_assignments();
        assert_eq!(assignments.len(), coordinator.list_devices().len());
        assert!(assignments.values().all(|a| a.rules_version == version && a.segment == 20));
    }

    #[test]
    fn test_every_classification_is_emitted() {
        let sink = Arc::new(RecordingSink::default());
        let coordinator = Coordinator::new(sink.clone());

        coordinator.ingest("t", br#"{"device_id":"a","type":"camera","location":"gate","message_rate":4,"temperature":31}"#);
        coordinator.ingest("t", br#"{"device_id":"b"}"#);
        coordinator.ingest("t", br#"{"name":"no id"}"#);
        coordinator.replace_rule_set(RuleSet::empty());

        let rows = sink.rows.lock();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].device_type, "camera");
        assert_eq!(rows[0].location, "gate");
        assert_eq!(rows[0].message_rate, 4.0);
        assert_eq!(rows[0].vlan, 10);
        assert_eq!(rows[1].device_type, "unknown");
        assert!(rows[2..].iter().all(|r| r.vlan == i64::from(DEFAULT_SEGMENT)));
    }

    #[test]
    fn test_stats_counts_segments() {
        let coordinator = Coordinator::default();
        coordinator.ingest("t", br#"{"device_id":"a","temperature":35}"#);
        coordinator.ingest("t", br#"{"device_id":"b","temperature":31}"#);
        coordinator.ingest("t", br#"{"device_id":"c"}"#);

        let stats = coordinator.stats();
        assert_eq!(stats.devices, 3);
        assert_eq!(stats.assignments, 3);
        assert_eq!(stats.rules_version, 1);
        assert_eq!(stats.segments.get(&10), Some(&2));
        assert_eq!(stats.segments.get(&DEFAULT_SEGMENT), Some(&1));
    }
}
