use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};

use crate::config::LayerConfig;
use crate::types::{ExportRecord, FileId, FileRecord, ImportEdge, Layer, LayerId};

/// Compiled layer table plus glob matchers, built once from config.
pub struct LayerTable {
    layers: Vec<Layer>,
    matchers: Vec<globset::GlobSet>,
}

impl LayerTable {
    pub fn new(configs: &[LayerConfig]) -> Self {
        let mut layers = Vec::new();
        let mut matchers = Vec::new();
        for (i, cfg) in configs.iter().enumerate() {
            let mut builder = globset::GlobSetBuilder::new();
            for pat in &cfg.path {
                if let Ok(g) = globset::Glob::new(pat) {
                    builder.add(g);
                }
            }
            let matcher = builder
                .build()
                .unwrap_or_else(|_| globset::GlobSetBuilder::new().build().unwrap());
            matchers.push(matcher);
            layers.push(Layer {
                id: LayerId(i as u32),
                name: cfg.name.clone(),
                patterns: cfg.path.clone(),
                allowed_dependencies: cfg.depends_on.clone(),
            });
        }
        Self { layers, matchers }
    }

    /// First matching layer, in declaration order.
    pub fn classify(&self, rel_path: &str) -> Option<LayerId> {
        self.matchers
            .iter()
            .position(|m| m.is_match(rel_path))
            .map(|i| LayerId(i as u32))
    }

    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(id.0 as usize)
    }

    pub fn by_name(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn all(&self) -> &[Layer] {
        &self.layers
    }

    /// Can a file in `from` depend on a file in `to`, per the layer model:
    /// same layer, either side unclassified, `to` named in `from`'s allowed
    /// list, or `from` allows `*`.
    pub fn can_depend(&self, from: Option<LayerId>, to: Option<LayerId>) -> bool {
        let (Some(from), Some(to)) = (from, to) else {
            return true;
        };
        if from == to {
            return true;
        }
        let Some(from_layer) = self.get(from) else {
            return true;
        };
        let Some(to_layer) = self.get(to) else {
            return true;
        };
        from_layer.allows(&to_layer.name)
    }
}

#[derive(Debug, Clone)]
struct GraphNode {
    file_id: FileId,
    layer: Option<LayerId>,
}

/// Import dependency graph over the file arena. Built once, read-only
/// thereafter. Files are addressed by [`FileId`]; cycles are legal.
pub struct ImportGraph {
    graph: DiGraph<GraphNode, ()>,
    index: HashMap<FileId, NodeIndex>,
    edges: Vec<ImportEdge>,
    exports: HashMap<FileId, Vec<ExportRecord>>,
    incoming: HashMap<FileId, usize>,
    layers: Vec<Layer>,
}

impl ImportGraph {
    /// Build the graph from walked files (so that files with no imports or
    /// exports still appear as nodes) and per-file parse outputs.
    pub fn build(
        files: &[FileRecord],
        layer_table: &LayerTable,
        file_edges: &HashMap<FileId, Vec<ImportEdge>>,
        file_exports: &HashMap<FileId, Vec<ExportRecord>>,
    ) -> Self {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();

        let mut sorted_files: Vec<&FileRecord> = files.iter().filter(|f| !f.is_dir).collect();
        sorted_files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));

        for f in &sorted_files {
            let layer = layer_table.classify(&f.rel_path);
            let idx = graph.add_node(GraphNode {
                file_id: f.id,
                layer,
            });
            index.insert(f.id, idx);
        }

        let mut all_edges = Vec::new();
        let mut incoming: HashMap<FileId, usize> = HashMap::new();

        for f in &sorted_files {
            let Some(edges) = file_edges.get(&f.id) else {
                continue;
            };
            for edge in edges {
                if let Some(target) = edge.resolved {
                    if let (Some(&from_idx), Some(&to_idx)) =
                        (index.get(&f.id), index.get(&target))
                    {
                        graph.add_edge(from_idx, to_idx, ());
                        *incoming.entry(target).or_insert(0) += 1;
                    }
                }
                all_edges.push(edge.clone());
            }
        }

        Self {
            graph,
            index,
            edges: all_edges,
            exports: file_exports.clone(),
            incoming,
            layers: layer_table.all().to_vec(),
        }
    }

    pub fn layer_of(&self, file: FileId) -> Option<LayerId> {
        self.index.get(&file).and_then(|&idx| self.graph[idx].layer)
    }

    pub fn layer_by_id(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(id.0 as usize)
    }

    pub fn layer_by_name(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Same semantics as [`LayerTable::can_depend`], kept on the graph
    /// itself so rules only need a read-only `ImportGraph` reference.
    pub fn can_depend(&self, from: Option<LayerId>, to: Option<LayerId>) -> bool {
        let (Some(from), Some(to)) = (from, to) else {
            return true;
        };
        if from == to {
            return true;
        }
        let Some(from_layer) = self.layer_by_id(from) else {
            return true;
        };
        let Some(to_layer) = self.layer_by_id(to) else {
            return true;
        };
        from_layer.allows(&to_layer.name)
    }

    /// Outgoing resolved targets for `file`.
    pub fn deps_of(&self, file: FileId) -> Vec<FileId> {
        let Some(&idx) = self.index.get(&file) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .map(|n| self.graph[n].file_id)
            .collect()
    }

    pub fn incoming_count(&self, file: FileId) -> usize {
        self.incoming.get(&file).copied().unwrap_or(0)
    }

    pub fn files_in_layer(&self, layer: LayerId) -> Vec<FileId> {
        self.graph
            .node_weights()
            .filter(|n| n.layer == Some(layer))
            .map(|n| n.file_id)
            .collect()
    }

    pub fn exports_of(&self, file: FileId) -> &[ExportRecord] {
        self.exports.get(&file).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// All import edges (resolved and unresolved) in insertion order.
    pub fn edges(&self) -> &[ImportEdge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Strongly-connected components with more than one member: import
    /// cycles. Retained from the teacher for future diagnostic use; core
    /// rules do not require cycle detection.
    pub fn find_cycles(&self) -> Vec<Vec<FileId>> {
        petgraph::algo::kosaraju_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| scc.iter().map(|&idx| self.graph[idx].file_id).collect())
            .collect()
    }
}
