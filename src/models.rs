use serde::{Serialize, Deserialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    Gaming,
    Streaming,
    #[serde(rename = "Content Creation")]
    ContentCreation,
    Workstation,
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Purpose::Gaming => "Gaming",
            Purpose::Streaming => "Streaming",
            Purpose::ContentCreation => "Content Creation",
            Purpose::Workstation => "Workstation",
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceTier {
    Budget,
    #[serde(rename = "Mid-Range")]
    MidRange,
    #[serde(rename = "High-End")]
    HighEnd,
    Enthusiast,
}

impl fmt::Display for PerformanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PerformanceTier::Budget => "Budget",
            PerformanceTier::MidRange => "Mid-Range",
            PerformanceTier::HighEnd => "High-End",
            PerformanceTier::Enthusiast => "Enthusiast",
        })
    }
}

/// User input for one generation call.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuildRequest {
    pub budget: f64,
    pub currency: String,
    pub count: u32,
    pub purpose: Purpose,
    pub performance_tier: PerformanceTier,
    #[serde(default)]
    pub notes: Option<String>, // free text, empty means none
}

impl BuildRequest {
    pub const MAX_BUILDS: u32 = 3;

    /// Notes exactly as given, `None` when absent or empty.
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref().filter(|n| !n.is_empty())
    }

    /// Independent range checks only; whether the budget is achievable is left to the model.
    pub fn validate(&self) -> Result<(), String> {
        if !self.budget.is_finite() || self.budget <= 0.0 {
            return Err(format!("budget must be a positive number, got {}", self.budget));
        }
        if self.currency.trim().is_empty() {
            return Err("currency must not be empty".into());
        }
        if self.count == 0 || self.count > Self::MAX_BUILDS {
            return Err(format!("count must be between 1 and {}, got {}", Self::MAX_BUILDS, self.count));
        }
        Ok(())
    }
}

/// Component category. Labels the model invents outside the fixed set are kept verbatim.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum ComponentType {
    Cpu,
    Gpu,
    Motherboard,
    Ram,
    Storage,
    Psu,
    Case,
    Other(String),
}

impl ComponentType {
    /// Fixed display order used by comparisons.
    pub const ALL: [ComponentType; 7] = [
        ComponentType::Cpu,
        ComponentType::Gpu,
        ComponentType::Motherboard,
        ComponentType::Ram,
        ComponentType::Storage,
        ComponentType::Psu,
        ComponentType::Case,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            ComponentType::Cpu => "CPU",
            ComponentType::Gpu => "GPU",
            ComponentType::Motherboard => "Motherboard",
            ComponentType::Ram => "RAM",
            ComponentType::Storage => "Storage",
            ComponentType::Psu => "PSU",
            ComponentType::Case => "Case",
            ComponentType::Other(label) => label,
        }
    }
}

impl From<String> for ComponentType {
    fn from(label: String) -> Self {
        match label.as_str() {
            "CPU" => ComponentType::Cpu,
            "GPU" => ComponentType::Gpu,
            "Motherboard" => ComponentType::Motherboard,
            "RAM" => ComponentType::Ram,
            "Storage" => ComponentType::Storage,
            "PSU" => ComponentType::Psu,
            "Case" => ComponentType::Case,
            _ => ComponentType::Other(label),
        }
    }
}

impl From<ComponentType> for String {
    fn from(kind: ComponentType) -> Self {
        match kind {
            ComponentType::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for ComponentType {
    fn default() -> Self {
        ComponentType::Other(String::new())
    }
}

/// Field decoders for model output. The response schema is enforced by the
/// provider, so a missing or oddly typed subfield falls back to a default
/// instead of failing the whole reply.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn text<'de, D, T>(d: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: From<String>,
    {
        Ok(T::from(opt_text(d)?.unwrap_or_default()))
    }

    pub fn opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(opt_number(d)?.unwrap_or_default())
    }

    pub fn opt_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    /// Keeps the items that decode; a non-array becomes empty.
    pub fn list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: serde::de::DeserializeOwned,
    {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match T::deserialize(item) {
                    Ok(v) => Some(v),
                    Err(e) => {
                        tracing::warn!("⚠️ Dropping undecodable list item: {}", e);
                        None
                    }
                })
                .collect(),
            _ => Vec::new(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    #[serde(rename = "type", default, deserialize_with = "lenient::text")]
    pub kind: ComponentType,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::opt_number", skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_text", skip_serializing_if = "Option::is_none")]
    pub price_link: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text", skip_serializing_if = "Option::is_none")]
    pub specs: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_number", skip_serializing_if = "Option::is_none")]
    pub power_draw: Option<f64>, // watts
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GamePerformance {
    #[serde(default, deserialize_with = "lenient::text")]
    pub game_name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub fps: String, // e.g. "120-140 FPS", not guaranteed numeric
    #[serde(default, deserialize_with = "lenient::text")]
    pub settings: String,
}

/// One candidate configuration as returned by the model.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PCBuild {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub build_name: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub total_price: f64,
    #[serde(default, deserialize_with = "lenient::text")]
    pub currency: String,
    #[serde(default, deserialize_with = "lenient::opt_number", skip_serializing_if = "Option::is_none")]
    pub estimated_wattage: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub target_resolution: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub average_fps: f64,
    #[serde(default, deserialize_with = "lenient::list")]
    pub components: Vec<Component>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub performance: String,
    #[serde(default, deserialize_with = "lenient::list")]
    pub game_performance: Vec<GamePerformance>,
}

impl PCBuild {
    /// Stamps a fresh handle unless one is already present, and returns it.
    pub fn assign_id(&mut self) -> Uuid {
        *self.id.get_or_insert_with(Uuid::new_v4)
    }

    pub fn component(&self, kind: &ComponentType) -> Option<&Component> {
        self.components.iter().find(|c| &c.kind == kind)
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    #[serde(default)]
    pub request: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BuildsResponse {
    pub builds: Vec<PCBuild>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self { error: message.into() }
    }
}
