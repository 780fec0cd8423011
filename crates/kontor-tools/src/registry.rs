// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Declarative tool catalogue and the industry visibility filter.
//!
//! Every tool the agent can call is described here once: name, purpose
//! and a JSON Schema for its arguments. The registry never executes
//! anything; execution lives in [`crate::exec`]. The provider adapter
//! serializes the *filtered* spec list on every request, so a tenant
//! outside the talent-agency vertical never even sees the talent and
//! booking tools.

use std::collections::HashMap;

use kontor_core::Industry;
use serde_json::Value;

use crate::catalog;

/// Read tools never mutate state and never hit the action ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Read,
    Mutating,
}

/// One entry in the tool catalogue.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: ToolKind,
    /// Hidden outside the talent-agency vertical unless the caller is
    /// elevated.
    pub talent_only: bool,
    /// Name-bearing lookup/update/delete: arguments must pass the
    /// hallucination guard before execution.
    pub grounded: bool,
    /// JSON Schema for the arguments object.
    pub parameters: Value,
}

impl ToolSpec {
    pub(crate) fn read(name: &'static str, description: &'static str, parameters: Value) -> Self {
        Self {
            name,
            description,
            kind: ToolKind::Read,
            talent_only: false,
            grounded: false,
            parameters,
        }
    }

    pub(crate) fn mutating(
        name: &'static str,
        description: &'static str,
        parameters: Value,
    ) -> Self {
        Self {
            name,
            description,
            kind: ToolKind::Mutating,
            talent_only: false,
            grounded: false,
            parameters,
        }
    }

    pub(crate) fn grounded(mut self) -> Self {
        self.grounded = true;
        self
    }

    pub(crate) fn talent_only(mut self) -> Self {
        self.talent_only = true;
        self
    }

    pub fn is_read(&self) -> bool {
        self.kind == ToolKind::Read
    }
}

/// Immutable catalogue of all tools, indexed by name.
pub struct ToolRegistry {
    specs: Vec<ToolSpec>,
    by_name: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        let specs = catalog::all_specs();
        let by_name = specs
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name, i))
            .collect();
        Self { specs, by_name }
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.by_name.get(name).map(|&i| &self.specs[i])
    }

    /// Specs visible to one request. Talent and booking tools are
    /// filtered out unless the tenant is in the talent-agency vertical
    /// or the caller holds an elevated role.
    pub fn visible_for(&self, industry: Industry, elevated: bool) -> Vec<&ToolSpec> {
        let show_talent = industry == Industry::TalentAgency || elevated;
        self.specs
            .iter()
            .filter(|s| show_talent || !s.talent_only)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_is_complete() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.len(), 33);
        for name in [
            "create_contact",
            "update_lead_stage",
            "bulk_delete_tasks",
            "search_projects",
            "create_talent",
            "update_booking_status",
            "update_invoice_status",
            "delete_expense",
        ] {
            assert!(registry.get(name).is_some(), "missing {name}");
        }
        assert!(registry.get("drop_all_tables").is_none());
    }

    #[test]
    fn every_schema_is_an_object() {
        let registry = ToolRegistry::new();
        for spec in registry.visible_for(Industry::TalentAgency, false) {
            assert_eq!(
                spec.parameters["type"],
                serde_json::json!("object"),
                "bad schema for {}",
                spec.name
            );
            assert!(!spec.description.is_empty());
        }
    }

    #[test]
    fn talent_tools_hidden_outside_vertical() {
        let registry = ToolRegistry::new();
        let general = registry.visible_for(Industry::General, false);
        assert!(general.iter().all(|s| !s.talent_only));
        assert_eq!(general.len(), 33 - 6);
        assert!(!general.iter().any(|s| s.name == "create_booking"));
    }

    #[test]
    fn elevated_caller_sees_talent_tools_anywhere() {
        let registry = ToolRegistry::new();
        let elevated = registry.visible_for(Industry::General, true);
        assert_eq!(elevated.len(), 33);
        assert!(elevated.iter().any(|s| s.name == "search_talent"));
    }

    #[test]
    fn talent_agency_sees_full_catalogue() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.visible_for(Industry::TalentAgency, false).len(), 33);
    }

    #[test]
    fn read_tools_are_marked() {
        let registry = ToolRegistry::new();
        let reads: Vec<&str> = registry
            .visible_for(Industry::TalentAgency, false)
            .iter()
            .filter(|s| s.is_read())
            .map(|s| s.name)
            .collect();
        assert_eq!(reads.len(), 10);
        assert!(reads.contains(&"search_contacts"));
        assert!(reads.contains(&"count_leads"));
        assert!(!reads.contains(&"create_contact"));
    }

    #[test]
    fn grounded_tools_are_the_name_bearing_mutations() {
        let registry = ToolRegistry::new();
        assert!(registry.get("update_contact").is_some_and(|s| s.grounded));
        assert!(registry.get("delete_task").is_some_and(|s| s.grounded));
        // Creates introduce new names and must not be guarded.
        assert!(registry.get("create_contact").is_some_and(|s| !s.grounded));
        // Bulk ops target ids, not names.
        assert!(
            registry
                .get("bulk_delete_tasks")
                .is_some_and(|s| !s.grounded)
        );
    }
}
