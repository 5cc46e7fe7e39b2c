use daqmx_types::{FunctionEntry, SizeSpec};
use std::collections::{BTreeMap, BTreeSet};

/* Edge `from -> to` means "`from` needs `to` bound first". */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyKind {
    /// A len-derived size slot reads the measured length of its buffer
    LengthOf,
    /// A buffer is bounded by a caller-supplied or discovered size parameter
    SizedBy,
    /// A buffer's size expression reads an in-parameter
    ExpressionOperand,
}

#[derive(Debug, Clone)]
pub struct Dependency {
    pub from: String,
    pub to: String,
    pub kind: DependencyKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclePath {
    pub cycle: Vec<String>,
}

/// Sizing graph of one function. Nodes are parameter names; declaration order
/// is the tie-break for every traversal so results never depend on hashing.
#[derive(Debug, Default)]
pub struct SizeGraph {
    pub nodes: Vec<String>,
    pub edges: Vec<Dependency>,
    pub adjacency_list: BTreeMap<String, Vec<String>>,
}

impl SizeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /* Builds the graph from declared size specifications. Size referents that do
     * not resolve to a parameter are returned separately so the caller can report them. */
    pub fn from_entry(entry: &FunctionEntry) -> (Self, Vec<(String, String)>) {
        let mut graph = SizeGraph::new();
        let mut unresolved = Vec::new();

        for param in &entry.parameters {
            graph.add_node(param.name.clone());
        }

        for param in &entry.parameters {
            let Some(size) = &param.size else {
                continue;
            };
            let referents = match size.referents() {
                Ok(referents) => referents,
                /* malformed expressions are reported by the solver */
                Err(_) => BTreeSet::new(),
            };
            for referent in referents {
                let Some(idx) = entry.param_index_by_any_name(&referent) else {
                    /* undefined expression identifiers are reported by the solver */
                    if !matches!(size, SizeSpec::CustomCode(_)) {
                        unresolved.push((param.name.clone(), referent));
                    }
                    continue;
                };
                let peer = entry.parameters[idx].name.clone();
                let dep = match size {
                    SizeSpec::Len(_) => Dependency {
                        from: peer,
                        to: param.name.clone(),
                        kind: DependencyKind::LengthOf,
                    },
                    SizeSpec::CustomCode(_) => Dependency {
                        from: param.name.clone(),
                        to: peer,
                        kind: DependencyKind::ExpressionOperand,
                    },
                    SizeSpec::PassedIn(_) | SizeSpec::PassedInByPtr(_) | SizeSpec::IviDance(_) => Dependency {
                        from: param.name.clone(),
                        to: peer,
                        kind: DependencyKind::SizedBy,
                    },
                };
                graph.add_dependency(dep);
            }
        }

        (graph, unresolved)
    }

    pub fn add_node(&mut self, name: String) {
        if !self.nodes.contains(&name) {
            self.nodes.push(name.clone());
        }
        self.adjacency_list.entry(name).or_default();
    }

    pub fn add_dependency(&mut self, dep: Dependency) {
        self.add_node(dep.from.clone());
        self.add_node(dep.to.clone());

        let targets = self.adjacency_list.entry(dep.from.clone()).or_default();
        if !targets.contains(&dep.to) {
            targets.push(dep.to.clone());
        }

        self.edges.push(dep);
    }

    pub fn dependencies_of(&self, node: &str) -> &[String] {
        self.adjacency_list.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Detect cycles using DFS, visiting nodes in declaration order.
    pub fn detect_cycles(&self) -> Vec<CyclePath> {
        let mut cycles = Vec::new();
        let mut visited = BTreeSet::new();
        let mut rec_stack = BTreeSet::new();
        let mut path = Vec::new();

        for node in &self.nodes {
            if !visited.contains(node) {
                self.dfs_cycle_detection(node, &mut visited, &mut rec_stack, &mut path, &mut cycles);
            }
        }

        cycles
    }

    fn dfs_cycle_detection(
        &self,
        node: &str,
        visited: &mut BTreeSet<String>,
        rec_stack: &mut BTreeSet<String>,
        path: &mut Vec<String>,
        cycles: &mut Vec<CyclePath>,
    ) {
        visited.insert(node.to_string());
        rec_stack.insert(node.to_string());
        path.push(node.to_string());

        for neighbor in self.dependencies_of(node) {
            if !visited.contains(neighbor) {
                self.dfs_cycle_detection(neighbor, visited, rec_stack, path, cycles);
            } else if rec_stack.contains(neighbor) {
                if let Some(start) = path.iter().position(|x| x == neighbor) {
                    let mut cycle = path[start..].to_vec();
                    cycle.push(neighbor.clone());
                    cycles.push(CyclePath { cycle });
                }
            }
        }

        path.pop();
        rec_stack.remove(node);
    }

    /// Evaluation order by Kahn's algorithm: every node after the nodes it
    /// depends on. `None` when the graph has a cycle.
    pub fn topological_sort(&self) -> Option<Vec<String>> {
        let position: BTreeMap<&str, usize> =
            self.nodes.iter().enumerate().map(|(idx, name)| (name.as_str(), idx)).collect();

        let mut in_degree: BTreeMap<&str, usize> = self.nodes.iter().map(|n| (n.as_str(), 0)).collect();
        let mut reverse_adjacency: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

        for (from, targets) in &self.adjacency_list {
            for to in targets {
                *in_degree.entry(from.as_str()).or_insert(0) += 1;
                reverse_adjacency.entry(to.as_str()).or_default().push(from.as_str());
            }
        }

        /* ready set keyed by declaration position */
        let mut ready: BTreeSet<(usize, &str)> = in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(&node, _)| (position.get(node).copied().unwrap_or(usize::MAX), node))
            .collect();
        let mut result = Vec::with_capacity(self.nodes.len());

        while let Some((_, node)) = ready.pop_first() {
            result.push(node.to_string());

            if let Some(dependents) = reverse_adjacency.get(node) {
                for &dependent in dependents {
                    if let Some(degree) = in_degree.get_mut(dependent) {
                        *degree -= 1;
                        if *degree == 0 {
                            ready.insert((position.get(dependent).copied().unwrap_or(usize::MAX), dependent));
                        }
                    }
                }
            }
        }

        if result.len() == self.nodes.len() {
            Some(result)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daqmx_types::FunctionEntry;

    fn entry(yaml: &str) -> FunctionEntry {
        serde_yml::from_str(yaml).unwrap()
    }

    #[test]
    fn len_edges_point_from_size_to_buffer() {
        let entry = entry(
            r#"
calling_convention: StdCall
returns: int32
parameters:
  - { name: numSampsPerChan, direction: in, type: int32 }
  - { name: writeArray, direction: in, type: "const float64[]", size: { mechanism: len, value: numSampsPerChan } }
"#,
        );
        let (graph, unresolved) = SizeGraph::from_entry(&entry);
        assert!(unresolved.is_empty());
        assert_eq!(graph.dependencies_of("numSampsPerChan"), ["writeArray".to_string()]);
        assert_eq!(
            graph.topological_sort().unwrap(),
            vec!["writeArray".to_string(), "numSampsPerChan".to_string()]
        );
    }

    #[test]
    fn expression_operands_come_first() {
        let entry = entry(
            r#"
calling_convention: StdCall
returns: int32
parameters:
  - { name: coeffs, direction: out, type: "float64[]", size: { mechanism: custom-code, value: "order + 1" } }
  - { name: order, direction: in, type: int32 }
"#,
        );
        let (graph, _) = SizeGraph::from_entry(&entry);
        assert_eq!(graph.topological_sort().unwrap(), vec!["order".to_string(), "coeffs".to_string()]);
        assert!(graph.detect_cycles().is_empty());
    }

    #[test]
    fn mutual_sizing_is_a_cycle() {
        let entry = entry(
            r#"
calling_convention: StdCall
returns: int32
parameters:
  - { name: a, direction: out, type: "int32[]", size: { mechanism: passed-in, value: b } }
  - { name: b, direction: out, type: "int32[]", size: { mechanism: passed-in, value: a } }
"#,
        );
        let (graph, _) = SizeGraph::from_entry(&entry);
        let cycles = graph.detect_cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].cycle, vec!["a".to_string(), "b".to_string(), "a".to_string()]);
        assert!(graph.topological_sort().is_none());
    }

    #[test]
    fn unknown_referents_are_collected() {
        let entry = entry(
            r#"
calling_convention: StdCall
returns: int32
parameters:
  - { name: data, direction: out, type: "float64[]", size: { mechanism: passed-in, value: missing } }
"#,
        );
        let (_, unresolved) = SizeGraph::from_entry(&entry);
        assert_eq!(unresolved, vec![("data".to_string(), "missing".to_string())]);
    }
}
