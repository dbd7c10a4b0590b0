use portal14_core::{AcceptedFlag, Config};

use super::open_store;

pub fn accept() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let store = open_store();
    let flag = AcceptedFlag::new(config.experience.accepted_key);
    let persisted = flag.write(store.as_ref());
    println!(
        "{}",
        serde_json::json!({ "type": "accept_recorded", "persisted": persisted })
    );
    Ok(())
}

pub fn reset() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let store = open_store();
    let flag = AcceptedFlag::new(config.experience.accepted_key);
    let cleared = flag.clear(store.as_ref());
    println!(
        "{}",
        serde_json::json!({ "type": "accept_cleared", "cleared": cleared })
    );
    Ok(())
}
