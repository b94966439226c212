//! Generation layout
//!
//! Rows are generations, ordered ascending from the most negative one.
//! Within a row nodes run left to right by ascending id, evenly spaced.

use super::node::Node;
use super::types::{NodeId, Position};
use crate::config::LayoutConfig;
use std::collections::BTreeMap;

/// Assigns display coordinates from generation numbers
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationLayout {
    config: LayoutConfig,
}

impl GenerationLayout {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Compute a position for every node, keyed by id.
    ///
    /// The result depends only on the `(id, generation)` pairs, so the same
    /// input always yields the same coordinates.
    pub fn compute<'a, I>(&self, nodes: I) -> BTreeMap<NodeId, Position>
    where
        I: IntoIterator<Item = &'a Node>,
    {
        let mut rows: BTreeMap<i64, Vec<NodeId>> = BTreeMap::new();
        for node in nodes {
            rows.entry(node.generation()).or_default().push(node.id());
        }

        let mut positions = BTreeMap::new();
        for (row, (_generation, mut ids)) in rows.into_iter().enumerate() {
            ids.sort();
            let y = self.config.y_origin + row as f64 * self.config.y_step;
            for (column, id) in ids.into_iter().enumerate() {
                let x = self.config.x_origin + column as f64 * self.config.x_step;
                positions.insert(id, Position::new(x, y));
            }
        }
        positions
    }
}

impl Default for GenerationLayout {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}
