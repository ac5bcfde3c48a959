use crate::models::BuildRequest;
use serde_json::{json, Value};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Everything one provider call needs: resolved model, instruction text and output schema.
#[derive(Debug, Clone)]
pub struct GenerationPlan {
    pub model: String,
    pub prompt: String,
    pub schema: Value,
}

impl GenerationPlan {
    pub fn new(model: impl Into<String>, request: &BuildRequest) -> Self {
        Self {
            model: model.into(),
            prompt: build_prompt(request),
            schema: response_schema(),
        }
    }
}

pub fn build_prompt(request: &BuildRequest) -> String {
    let BuildRequest { budget, currency, count, purpose, performance_tier, .. } = request;
    let mut prompt = format!(
        "You are an expert PC builder. Generate {count} complete PC builds for a budget of {budget} {currency}. \
        The user's primary use for this PC is '{purpose}' and they are looking for a '{performance_tier}' performance tier. \
        The builds must be optimized for this purpose and performance level. \
        For each build, provide a unique name, a list of components (CPU, GPU, Motherboard, RAM, Storage, PSU, Case) with their individual estimated prices, \
        key specs for each component (e.g., '16GB DDR5 6000MHz' for RAM), estimated power draw for CPU and GPU, the total price, total estimated wattage, \
        a target resolution (e.g., '1080p', '1440p', '4K') the build is optimized for, an estimated average FPS as a number for that resolution across modern AAA games, \
        a one-sentence performance summary, and estimated performance in popular games like Fortnite and Warzone. \
        Also provide a plausible Amazon search URL for each component, formatted as 'https://www.amazon.com/s?k=COMPONENT_NAME&tag=deazlly-20'. \
        The total price must not exceed the budget. Respond in valid JSON format according to the provided schema."
    );
    if let Some(notes) = request.notes() {
        prompt.push_str(&format!(
            " The user also provided these additional notes: '{notes}'. Please take these into consideration."
        ));
    }
    prompt
}

/// Structured-output contract handed to the model, in Gemini's OpenAPI-subset dialect.
pub fn response_schema() -> Value {
    let component = json!({
        "type": "OBJECT",
        "properties": {
            "type": {
                "type": "STRING",
                "description": "The type of the component. Must be one of: 'CPU', 'GPU', 'Motherboard', 'RAM', 'Storage', 'PSU', 'Case'."
            },
            "name": {
                "type": "STRING",
                "description": "The specific model name of the component, e.g., 'AMD Ryzen 5 5600X' or 'NVIDIA GeForce RTX 4070'."
            },
            "price": {
                "type": "NUMBER",
                "description": "The estimated price of this individual component in the specified currency."
            },
            "priceLink": {
                "type": "STRING",
                "description": "An Amazon search URL for the component in the format https://www.amazon.com/s?k={encoded_component_name}&tag=deazlly-20."
            },
            "specs": {
                "type": "STRING",
                "description": "Key specifications, e.g., '16GB (2x8GB) DDR5 6000MHz CL30' for RAM, or '12GB GDDR6X' for GPU."
            },
            "powerDraw": {
                "type": "NUMBER",
                "description": "Estimated power draw in watts, especially for CPU and GPU. 0 for components without significant draw."
            }
        },
        "required": ["type", "name", "price", "priceLink", "specs"]
    });

    let game_performance = json!({
        "type": "OBJECT",
        "properties": {
            "gameName": { "type": "STRING", "description": "The name of the game, e.g., 'Fortnite' or 'Warzone'." },
            "fps": { "type": "STRING", "description": "The estimated frames per second, e.g., '120-140 FPS'." },
            "settings": { "type": "STRING", "description": "The game settings used for the estimate, e.g., '1080p High'." }
        },
        "required": ["gameName", "fps", "settings"]
    });

    let build = json!({
        "type": "OBJECT",
        "properties": {
            "buildName": {
                "type": "STRING",
                "description": "A creative and marketable name for the PC build, like 'The Budget Beast' or '4K Dominator'."
            },
            "totalPrice": { "type": "NUMBER", "description": "The total estimated price of all components combined." },
            "currency": { "type": "STRING", "description": "The currency for the total price (e.g., USD, SAR)." },
            "estimatedWattage": { "type": "NUMBER", "description": "The total estimated power consumption of the build in watts." },
            "targetResolution": { "type": "STRING", "description": "The target resolution, e.g., '1080p', '1440p', or '4K'." },
            "averageFps": {
                "type": "NUMBER",
                "description": "The estimated average frames per second across modern AAA titles at the target resolution."
            },
            "components": { "type": "ARRAY", "description": "All PC components for the build.", "items": component },
            "performance": {
                "type": "STRING",
                "description": "A concise, one-sentence summary of the build's overall capability and target use case."
            },
            "gamePerformance": {
                "type": "ARRAY",
                "description": "Estimated performance metrics in popular games.",
                "items": game_performance
            }
        },
        "required": [
            "buildName", "totalPrice", "currency", "components", "performance",
            "gamePerformance", "estimatedWattage", "targetResolution", "averageFps"
        ]
    });

    json!({
        "type": "OBJECT",
        "properties": { "builds": { "type": "ARRAY", "items": build } },
        "required": ["builds"]
    })
}

/// Maps an operator-supplied model name onto a canonical Gemini identifier.
///
/// Names already ending in a family suffix (`-flash`, `-pro`, optionally `:latest`)
/// pass through trimmed; bare `gemini-2.5` / `gemini-2.0` get their flash variant;
/// anything else, including blank input, falls back to [`DEFAULT_MODEL`].
pub fn resolve_model_name(raw: Option<&str>) -> String {
    let trimmed = match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return DEFAULT_MODEL.to_string(),
    };
    let lower = trimmed.to_ascii_lowercase();
    let base = lower.strip_suffix(":latest").unwrap_or(&lower);
    if base.ends_with("-flash") || base.ends_with("-pro") {
        return trimmed.to_string();
    }
    match lower.as_str() {
        "gemini-2.5" => "gemini-2.5-flash".to_string(),
        "gemini-2.0" => "gemini-2.0-flash".to_string(),
        _ => DEFAULT_MODEL.to_string(),
    }
}
