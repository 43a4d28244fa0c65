//! Component Registry
//!
//! Defaults for the component kinds the tooling ships baselines for.
//! The core engine never consults this table implicitly; it only provides
//! sensible defaults (baseline path, tag field) to the CLI layer.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComponentConfig {
    pub name: &'static str,
    /// Repo-relative default baseline library path.
    pub baseline_default: &'static str,
    /// Primary tag field inside the profile (e.g. `valve_tag`).
    pub tag_field: &'static str,
}

pub const COMPONENTS: [ComponentConfig; 6] = [
    ComponentConfig {
        name: "valve",
        baseline_default: "data/valve_baseline.json",
        tag_field: "valve_tag",
    },
    ComponentConfig {
        name: "pump",
        baseline_default: "data/pump_baseline.json",
        tag_field: "pump_tag",
    },
    ComponentConfig {
        name: "steam_generator",
        baseline_default: "data/steam_generator_baseline.json",
        tag_field: "sg_tag",
    },
    ComponentConfig {
        name: "turbine",
        baseline_default: "data/turbine_baseline.json",
        tag_field: "turbine_tag",
    },
    ComponentConfig {
        name: "condenser",
        baseline_default: "data/condenser_baseline.json",
        tag_field: "condenser_tag",
    },
    ComponentConfig {
        name: "pressurizer",
        baseline_default: "data/pressurizer_baseline.json",
        tag_field: "pressurizer_tag",
    },
];

pub fn get_component(name: &str) -> Option<&'static ComponentConfig> {
    let key = name.trim().to_lowercase();
    COMPONENTS.iter().find(|c| c.name == key)
}

/// Default tag field for a component, registered or not.
pub fn tag_field_for(component: &str) -> String {
    match get_component(component) {
        Some(config) => config.tag_field.to_string(),
        None => format!("{}_tag", component.trim().to_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(get_component(" Valve ").unwrap().name, "valve");
        assert!(get_component("reactor").is_none());
    }

    #[test]
    fn steam_generator_uses_sg_tag() {
        assert_eq!(tag_field_for("steam_generator"), "sg_tag");
    }

    #[test]
    fn unregistered_component_gets_conventional_tag_field() {
        assert_eq!(tag_field_for("heat_exchanger"), "heat_exchanger_tag");
    }
}
