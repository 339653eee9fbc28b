//! Subcommand implementations

use anyhow::Result;
use axon_core::{AttrValue, FunctionKey};
use axon_runtime::cache::ADVERTISED_VALUE;
use axon_runtime::{Axon, AxonEvent};
use std::time::Duration;
use tracing::warn;

/// List registered hubs and their state
pub async fn hubs(axon: &Axon) -> Result<()> {
    let hubs = axon.list_hubs().await;
    if hubs.is_empty() {
        println!("no hubs registered");
        return Ok(());
    }
    for hub in hubs {
        println!(
            "{:12} {} (registered {})",
            format!("{:?}", hub.state).to_lowercase(),
            hub.url,
            hub.registered_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

/// List online functions of a class, in enumeration order
pub async fn list(axon: &Axon, class: &str) -> Result<()> {
    let ids = axon.enumerate(class).await?;
    if ids.is_empty() {
        println!("no {} online", class);
        return Ok(());
    }
    for id in ids {
        println!("{}", id);
    }
    Ok(())
}

/// Read one attribute of a function
pub async fn get(axon: &Axon, identifier: &str, attribute: &str) -> Result<()> {
    let resolved = axon.resolve(identifier).await?;
    let proxy = axon.find_or_create(&resolved.class_name, identifier).await;
    let value = proxy.get_attr(attribute).await?;
    println!("{}", value);
    Ok(())
}

/// Write one attribute of a function
pub async fn set(axon: &Axon, identifier: &str, attribute: &str, value: &str) -> Result<()> {
    let resolved = axon.resolve(identifier).await?;
    let proxy = axon.find_or_create(&resolved.class_name, identifier).await;
    proxy.set_attr(attribute, parse_value(value)).await?;
    println!("ok");
    Ok(())
}

/// Show a function's full attribute snapshot
pub async fn info(axon: &Axon, identifier: &str) -> Result<()> {
    let resolved = axon.resolve(identifier).await?;
    let proxy = axon.find_or_create(&resolved.class_name, identifier).await;

    println!("{}", proxy.describe().await);
    println!("class:  {}", resolved.class_name);
    println!("online: {}", proxy.is_online().await);

    let snapshot = proxy.load(axon.cache_validity()).await?;
    let mut names: Vec<&String> = snapshot.keys().collect();
    names.sort();
    for name in names {
        println!("  {} = {}", name, snapshot[name]);
    }
    Ok(())
}

/// Poll a function and print its advertised value whenever it changes
pub async fn watch(axon: &Axon, identifier: &str, interval_ms: u64) -> Result<()> {
    let resolved = axon.resolve(identifier).await?;
    let key = FunctionKey::new(resolved.class_name.clone(), resolved.hardware_id.clone());
    let proxy = axon.find_or_create(&resolved.class_name, identifier).await;

    let mut events = axon.subscribe();
    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(50)));

    println!("watching {} (ctrl-c to stop)", resolved.hardware_id);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Each refresh drives the value-change events below
                if let Err(e) = proxy.get_attr(ADVERTISED_VALUE).await {
                    warn!(function = %key, error = %e, "Refresh failed");
                }
            }
            event = events.recv() => {
                if let Ok(AxonEvent::ValueChanged { key: changed, value }) = event {
                    if changed == key {
                        println!("{} = {}", changed.hardware_id, value);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                return Ok(());
            }
        }
    }
}

/// Interpret a command-line value the way the wire expects it: booleans
/// and numbers stay typed, everything else is a string
fn parse_value(raw: &str) -> AttrValue {
    if raw == "true" {
        return AttrValue::Bool(true);
    }
    if raw == "false" {
        return AttrValue::Bool(false);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return AttrValue::Int(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return AttrValue::Float(f);
    }
    AttrValue::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("true"), AttrValue::Bool(true));
        assert_eq!(parse_value("42"), AttrValue::Int(42));
        assert_eq!(parse_value("-7"), AttrValue::Int(-7));
        assert_eq!(parse_value("12.5"), AttrValue::Float(12.5));
        assert_eq!(parse_value("mm"), AttrValue::from("mm"));
        // A numeric-looking name with a unit suffix stays a string
        assert_eq!(parse_value("12mm"), AttrValue::from("12mm"));
    }
}
