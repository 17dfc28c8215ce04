//! Mating and assembly-variant relationships between connectors.
//!
//! Both relations only ever link connectors with the same pole count, so the
//! collection is indexed by pole count and pairs are compared within each
//! group. Within a group the original record order is preserved, which keeps
//! the output identical to a scan over every pair.

use std::collections::HashMap;

use db::models::connector::{Connector, ConnectorType, Orientation};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// The fields the rules look at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectorKey<'a> {
    pub id: &'a str,
    pub pole_count: i64,
    pub connector_type: ConnectorType,
    pub orientation: Option<Orientation>,
}

impl<'a> From<&'a Connector> for ConnectorKey<'a> {
    fn from(connector: &'a Connector) -> Self {
        Self {
            id: &connector.id,
            pole_count: connector.pole_count,
            connector_type: connector.connector_type,
            orientation: connector.orientation,
        }
    }
}

/// Computed relationships of one connector. Empty lists are `None`, matching
/// the NULL stored for them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
pub struct ResolvedRelationships {
    pub connector_id: String,
    pub mates_with: Option<Vec<String>>,
    pub assembly_variants: Option<Vec<String>>,
}

impl ResolvedRelationships {
    pub fn mates_with(&self) -> &[String] {
        self.mates_with.as_deref().unwrap_or_default()
    }

    pub fn assembly_variants(&self) -> &[String] {
        self.assembly_variants.as_deref().unwrap_or_default()
    }
}

/// Female housing (R/S) against male housing (T) with the same pole count.
pub fn can_mate(a: &ConnectorKey<'_>, b: &ConnectorKey<'_>) -> bool {
    if a.pole_count != b.pole_count {
        return false;
    }
    let (a, b) = (a.connector_type, b.connector_type);
    (a.is_female_family() && b.is_male_family()) || (a.is_male_family() && b.is_female_family())
}

/// Same pole count and either the R/S cross-family pair, or the same type
/// mounted with a different orientation.
pub fn is_assembly_variant(a: &ConnectorKey<'_>, b: &ConnectorKey<'_>) -> bool {
    if a.pole_count != b.pole_count {
        return false;
    }
    let cross_family = matches!(
        (a.connector_type, b.connector_type),
        (ConnectorType::R, ConnectorType::S) | (ConnectorType::S, ConnectorType::R)
    );
    let other_mounting = a.connector_type == b.connector_type && a.orientation != b.orientation;
    cross_family || other_mounting
}

fn non_empty(ids: Vec<String>) -> Option<Vec<String>> {
    if ids.is_empty() { None } else { Some(ids) }
}

/// Resolve relationships for the complete connector collection. The result
/// has one entry per input record, in input order. Partial input yields
/// partial (asymmetric once persisted) results.
pub fn resolve(connectors: &[ConnectorKey<'_>]) -> Vec<ResolvedRelationships> {
    let mut by_pole_count: HashMap<i64, Vec<usize>> = HashMap::new();
    for (idx, connector) in connectors.iter().enumerate() {
        by_pole_count
            .entry(connector.pole_count)
            .or_default()
            .push(idx);
    }

    connectors
        .iter()
        .map(|connector| {
            let group = by_pole_count
                .get(&connector.pole_count)
                .map(Vec::as_slice)
                .unwrap_or_default();

            let mut mates_with = Vec::new();
            let mut assembly_variants = Vec::new();
            for other in group.iter().map(|&idx| &connectors[idx]) {
                if other.id == connector.id {
                    continue;
                }
                if can_mate(connector, other) {
                    mates_with.push(other.id.to_string());
                }
                if is_assembly_variant(connector, other) {
                    assembly_variants.push(other.id.to_string());
                }
            }

            ResolvedRelationships {
                connector_id: connector.id.to_string(),
                mates_with: non_empty(mates_with),
                assembly_variants: non_empty(assembly_variants),
            }
        })
        .collect()
}

pub fn resolve_connectors(connectors: &[Connector]) -> Vec<ResolvedRelationships> {
    let keys: Vec<ConnectorKey<'_>> = connectors.iter().map(ConnectorKey::from).collect();
    resolve(&keys)
}
