//! Bake deployment settings into the firmware.
//!
//! Values come from the process environment or an optional `.env` file at the
//! crate root. Unset keys fall back to the defaults in `aquamon_core::config`.

const KEYS: [&str; 7] = [
    "WIFI_SSID",
    "WIFI_PASSWORD",
    "MQTT_BROKER",
    "MQTT_PORT",
    "MQTT_CLIENT_ID",
    "MQTT_TOPIC",
    "PAYLOAD_FORMAT",
];

fn main() {
    println!("cargo:rerun-if-changed=.env");
    for key in KEYS {
        println!("cargo:rerun-if-env-changed={key}");
    }

    match dotenvy::dotenv() {
        Ok(path) => println!("cargo:warning=loaded settings from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => panic!("failed to parse .env: {e}"),
    }

    for key in KEYS {
        if let Ok(value) = std::env::var(key) {
            println!("cargo:rustc-env={key}={value}");
        }
    }
}
