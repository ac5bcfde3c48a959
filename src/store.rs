use crate::models::{ComponentType, PCBuild};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavedBuild {
    #[serde(flatten)]
    pub build: PCBuild,
    pub saved_at: DateTime<Utc>,
}

/// In-memory saved builds keyed by build id.
#[derive(Default)]
pub struct BuildStore {
    builds: RwLock<HashMap<Uuid, (u64, SavedBuild)>>, // (insertion seq, build)
    next_seq: AtomicU64,
}

impl BuildStore {
    /// Saves a build under its id (stamping one if missing); re-saving an id replaces it.
    pub fn save(&self, mut build: PCBuild) -> SavedBuild {
        let id = build.assign_id();
        let saved = SavedBuild { build, saved_at: Utc::now() };
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.builds.write().insert(id, (seq, saved.clone()));
        tracing::info!("💾 Saved build {} ({})", saved.build.build_name, id);
        saved
    }

    pub fn get(&self, id: &Uuid) -> Option<SavedBuild> {
        self.builds.read().get(id).map(|(_, saved)| saved.clone())
    }

    /// Saved builds in the order they were (last) saved.
    pub fn list(&self) -> Vec<SavedBuild> {
        let mut all: Vec<_> = self.builds.read().values().cloned().collect();
        all.sort_by_key(|(seq, _)| *seq);
        all.into_iter().map(|(_, saved)| saved).collect()
    }

    pub fn remove(&self, id: &Uuid) -> bool {
        self.builds.write().remove(id).is_some()
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRow {
    pub label: String,
    pub left: String,
    pub right: String,
    pub is_different: bool,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub left_name: String,
    pub right_name: String,
    pub rows: Vec<ComparisonRow>,
}

fn format_amount(amount: f64, currency: &str) -> String {
    format!("{:.2} {}", amount, currency)
}

fn describe_component(build: &PCBuild, kind: &ComponentType) -> (Option<String>, String) {
    match build.component(kind) {
        Some(c) => {
            let mut text = c.name.clone();
            if let Some(specs) = c.specs.as_deref().filter(|s| !s.is_empty()) {
                text.push_str(&format!(" ({specs})"));
            }
            if let Some(price) = c.price {
                text.push_str(&format!(" - {}", format_amount(price, &build.currency)));
            }
            (Some(c.name.clone()), text)
        }
        None => (None, "N/A".to_string()),
    }
}

/// Side-by-side view of two builds: totals, summary, then one row per component category.
pub fn compare(left: &PCBuild, right: &PCBuild) -> Comparison {
    let mut rows = vec![
        ComparisonRow {
            label: "Total Price".into(),
            left: format_amount(left.total_price, &left.currency),
            right: format_amount(right.total_price, &right.currency),
            is_different: left.total_price != right.total_price,
        },
        ComparisonRow {
            label: "Est. Performance".into(),
            left: left.performance.clone(),
            right: right.performance.clone(),
            is_different: left.performance != right.performance,
        },
    ];

    for kind in ComponentType::ALL.iter() {
        let (left_name, left_text) = describe_component(left, kind);
        let (right_name, right_text) = describe_component(right, kind);
        rows.push(ComparisonRow {
            label: kind.to_string(),
            left: left_text,
            right: right_text,
            is_different: left_name != right_name,
        });
    }

    Comparison { left_name: left.build_name.clone(), right_name: right.build_name.clone(), rows }
}

/// Plain-text summary for copy/share.
pub fn share_text(build: &PCBuild) -> String {
    let components = build
        .components
        .iter()
        .map(|c| match c.price {
            Some(price) => format!("{}: {} ({})", c.kind, c.name, format_amount(price, &build.currency)),
            None => format!("{}: {}", c.kind, c.name),
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Check out this awesome gaming PC build from AI PCBuilder!\n\n{} - {}\n\n{}\n\nvia PC Builder",
        build.build_name,
        format_amount(build.total_price, &build.currency),
        components
    )
}
