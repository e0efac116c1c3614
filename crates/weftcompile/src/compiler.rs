use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use weftcore::{
    Action, CompileError, CompiledEdge, ComponentRegistry, InputMapping, NodeMetadata,
    WorkflowDefinition, WorkflowGraph, ENTRYPOINT_COMPONENT,
};

/// Compile an authored graph into an execution-ready definition.
///
/// The output is deterministic: actions are ordered by Kahn's algorithm
/// with authoring order breaking ties, so compiling an unmodified graph
/// twice yields an identical definition. Cycles and graph-integrity
/// failures abort before any action is constructed; no partial
/// definition is ever returned. Malformed (single-handle) edges are
/// passed through for the validator to flag.
pub fn compile(
    graph: &WorkflowGraph,
    registry: &ComponentRegistry,
) -> Result<WorkflowDefinition, CompileError> {
    let node_index = index_nodes(graph)?;

    for node in &graph.nodes {
        if !registry.contains(&node.component) {
            return Err(CompileError::UnknownComponent {
                component: node.component.clone(),
                suggestions: registry.list(),
            });
        }
    }

    for edge in &graph.edges {
        for endpoint in [&edge.source, &edge.target] {
            if !node_index.contains_key(endpoint.as_str()) {
                return Err(CompileError::MissingNode {
                    edge: edge.id.clone(),
                    node: endpoint.clone(),
                });
            }
        }
    }

    detect_cycle(graph, &node_index)?;
    let order = topological_order(graph, &node_index)?;

    // Distinct source refs per target, in edge authoring order.
    let mut depends_on: HashMap<&str, Vec<String>> = HashMap::new();
    for edge in &graph.edges {
        let sources = depends_on.entry(edge.target.as_str()).or_default();
        if !sources.contains(&edge.source) {
            sources.push(edge.source.clone());
        }
    }

    let mut input_mappings: HashMap<&str, HashMap<String, InputMapping>> = HashMap::new();
    for edge in &graph.edges {
        if let (Some(source_handle), Some(target_handle)) =
            (&edge.source_handle, &edge.target_handle)
        {
            input_mappings.entry(edge.target.as_str()).or_default().insert(
                target_handle.clone(),
                InputMapping {
                    source_ref: edge.source.clone(),
                    source_handle: source_handle.clone(),
                },
            );
        }
    }

    let mut actions = Vec::with_capacity(graph.nodes.len());
    let mut entrypoint_ref = None;
    for id in &order {
        let node = &graph.nodes[node_index[id.as_str()]];
        if node.component == ENTRYPOINT_COMPONENT && entrypoint_ref.is_none() {
            entrypoint_ref = Some(node.id.clone());
        }
        actions.push(Action {
            node_ref: node.id.clone(),
            component: node.component.clone(),
            params: node.params.clone(),
            input_overrides: node.input_overrides.clone(),
            depends_on: depends_on.remove(node.id.as_str()).unwrap_or_default(),
            input_mappings: input_mappings.remove(node.id.as_str()).unwrap_or_default(),
            retry_policy: node.retry_policy.clone(),
        });
    }

    let dependency_counts = graph
        .nodes
        .iter()
        .map(|node| {
            let distinct: HashSet<&str> = graph
                .edges
                .iter()
                .filter(|e| e.target == node.id)
                .map(|e| e.source.as_str())
                .collect();
            (node.id.clone(), distinct.len())
        })
        .collect();

    let edges = graph
        .edges
        .iter()
        .map(|e| CompiledEdge {
            id: e.id.clone(),
            source_ref: e.source.clone(),
            target_ref: e.target.clone(),
            source_handle: e.source_handle.clone(),
            target_handle: e.target_handle.clone(),
            kind: e.kind,
        })
        .collect();

    let nodes = graph
        .nodes
        .iter()
        .map(|n| {
            (
                n.id.clone(),
                NodeMetadata {
                    component: n.component.clone(),
                    position: n.position,
                },
            )
        })
        .collect();

    tracing::debug!(
        title = %graph.title,
        actions = actions.len(),
        "compiled workflow definition"
    );

    Ok(WorkflowDefinition {
        title: graph.title.clone(),
        entrypoint_ref,
        nodes,
        actions,
        edges,
        dependency_counts,
        config: graph.config.clone(),
    })
}

/// Map node id to authoring index, rejecting duplicates.
fn index_nodes(graph: &WorkflowGraph) -> Result<HashMap<&str, usize>, CompileError> {
    let mut index = HashMap::with_capacity(graph.nodes.len());
    for (i, node) in graph.nodes.iter().enumerate() {
        if index.insert(node.id.as_str(), i).is_some() {
            return Err(CompileError::DuplicateNode(node.id.clone()));
        }
    }
    Ok(index)
}

/// Cycle check on a petgraph representation of the graph, before any
/// ordering work.
fn detect_cycle(
    graph: &WorkflowGraph,
    node_index: &HashMap<&str, usize>,
) -> Result<(), CompileError> {
    let mut digraph = DiGraph::<&str, ()>::new();
    let mut petgraph_index = HashMap::with_capacity(graph.nodes.len());
    for node in &graph.nodes {
        petgraph_index.insert(node.id.as_str(), digraph.add_node(node.id.as_str()));
    }
    for edge in &graph.edges {
        digraph.add_edge(
            petgraph_index[edge.source.as_str()],
            petgraph_index[edge.target.as_str()],
            (),
        );
    }
    debug_assert_eq!(petgraph_index.len(), node_index.len());

    if toposort(&digraph, None).is_err() {
        return Err(CompileError::Cycle);
    }
    Ok(())
}

/// Kahn's algorithm over distinct-source indegrees. Ties are broken by
/// authoring order, which makes the output order a pure function of
/// the input graph.
fn topological_order(
    graph: &WorkflowGraph,
    node_index: &HashMap<&str, usize>,
) -> Result<Vec<String>, CompileError> {
    let n = graph.nodes.len();
    let mut indegree = vec![0usize; n];
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut seen_pairs: HashSet<(usize, usize)> = HashSet::new();

    for edge in &graph.edges {
        let from = node_index[edge.source.as_str()];
        let to = node_index[edge.target.as_str()];
        // Parallel edges between the same pair (one data, one control)
        // contribute a single dependency.
        if seen_pairs.insert((from, to)) {
            outgoing[from].push(to);
            indegree[to] += 1;
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = (0..n)
        .filter(|&i| indegree[i] == 0)
        .map(Reverse)
        .collect();
    let mut order = Vec::with_capacity(n);

    while let Some(Reverse(current)) = ready.pop() {
        order.push(graph.nodes[current].id.clone());
        for &next in &outgoing[current] {
            indegree[next] -= 1;
            if indegree[next] == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    if order.len() != n {
        return Err(CompileError::Cycle);
    }
    Ok(order)
}
