//! Rule set handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;
use crate::models::RuleSet;

#[derive(Debug, Serialize)]
pub struct UpdateRulesResponse {
    pub status: &'static str,
    pub rules: RuleSet,
    pub version: u64,
    pub reclassified: usize,
}

/// Current rule set in its wire form
pub async fn get(State(state): State<AppState>) -> Json<RuleSet> {
    Json(state.coordinator.rule_set().as_ref().clone())
}

/// Replace the rule set and reclassify every device.
///
/// Any JSON body is accepted; unusable parts decode to nothing.
pub async fn update(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Json<UpdateRulesResponse> {
    let update = state.coordinator.replace_rule_set(RuleSet::from_value(&body));

    Json(UpdateRulesResponse {
        status: "success",
        rules: update.rules.as_ref().clone(),
        version: update.version,
        reclassified: update.reclassified,
    })
}
