//! Generate JSON Schema for settle settings
//!
//! This binary generates a JSON Schema from the Settings struct using schemars.
//! It's used to generate settings-schema.json for editor completion and the
//! settings UI.
//!
//! Usage:
//!   cargo run --features dev-bins --bin generate_schema > settings-schema.json

use schemars::schema_for;
use settle::settings::Settings;

fn main() {
    let schema = schema_for!(Settings);
    let mut json: serde_json::Value =
        serde_json::to_value(&schema).expect("Failed to serialize schema");

    // Remove the default value for profiles - it embeds the host platform's
    // shell path and the schema is for validation, not for storing defaults
    if let Some(properties) = json.get_mut("properties") {
        if let Some(profiles) = properties.get_mut("profiles") {
            if let Some(obj) = profiles.as_object_mut() {
                obj.remove("default");
            }
        }
    }

    let output = serde_json::to_string_pretty(&json).expect("Failed to serialize schema");
    println!("{}", output);
}
