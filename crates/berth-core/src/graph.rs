use berth_schema::Profile;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("name '{0}' is used by both a service and a dep")]
    NameCollision(String),
    #[error("unknown dependency '{name}' for '{referrer}'")]
    UnknownDependency { name: String, referrer: String },
    #[error("dependency cycle detected")]
    Cycle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Service,
    Dep,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub depends_on: Vec<String>,
}

/// Derived ordering structure over one profile; rebuilt per render and never
/// persisted.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub nodes: BTreeMap<String, Node>,
}

/// One node per service (edges = its dependsOn list) and one per dep.
/// Deps are leaves by construction. Service and dep namespaces must be
/// disjoint.
pub fn build_graph(profile: &Profile) -> Result<Graph, GraphError> {
    let mut nodes = BTreeMap::new();

    for (name, svc) in &profile.services {
        nodes.insert(
            name.clone(),
            Node {
                name: name.clone(),
                kind: NodeKind::Service,
                depends_on: svc.depends_on.clone(),
            },
        );
    }

    for name in profile.deps.keys() {
        if nodes.contains_key(name) {
            return Err(GraphError::NameCollision(name.clone()));
        }
        nodes.insert(
            name.clone(),
            Node {
                name: name.clone(),
                kind: NodeKind::Dep,
                depends_on: Vec::new(),
            },
        );
    }

    Ok(Graph { nodes })
}

/// Kahn's algorithm with a lexicographic tie-break: the ready queue is
/// re-sorted after every removal, so the emitted order is a pure function of
/// the node and edge set. Unknown dependency references are reported before
/// cycle detection runs.
pub fn topo_sort(graph: &Graph) -> Result<Vec<String>, GraphError> {
    let mut indegree: BTreeMap<&str, usize> = BTreeMap::new();
    let mut adjacent: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for (name, node) in &graph.nodes {
        indegree.entry(name).or_insert(0);
        for dep in &node.depends_on {
            adjacent.entry(dep).or_default().push(name);
        }
    }

    for (name, node) in &graph.nodes {
        for dep in &node.depends_on {
            if !graph.nodes.contains_key(dep) {
                return Err(GraphError::UnknownDependency {
                    name: dep.clone(),
                    referrer: name.clone(),
                });
            }
            if let Some(count) = indegree.get_mut(name.as_str()) {
                *count += 1;
            }
        }
    }

    let mut queue: Vec<&str> = indegree
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(name, _)| *name)
        .collect();
    queue.sort_unstable();

    let mut order = Vec::with_capacity(graph.nodes.len());
    while !queue.is_empty() {
        let current = queue.remove(0);
        order.push(current.to_owned());

        if let Some(next_nodes) = adjacent.get(current) {
            for next in next_nodes {
                if let Some(count) = indegree.get_mut(next) {
                    *count -= 1;
                    if *count == 0 {
                        queue.push(next);
                    }
                }
            }
        }
        queue.sort_unstable();
    }

    if order.len() != graph.nodes.len() {
        return Err(GraphError::Cycle);
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_schema::{Dep, Service};

    fn profile(services: &[(&str, &[&str])], deps: &[&str]) -> Profile {
        let mut p = Profile::default();
        for (name, depends) in services {
            p.services.insert(
                (*name).to_owned(),
                Service {
                    image: "img".to_owned(),
                    depends_on: depends.iter().map(|d| (*d).to_owned()).collect(),
                    ..Service::default()
                },
            );
        }
        for name in deps {
            p.deps.insert(
                (*name).to_owned(),
                Dep {
                    kind: "postgres".to_owned(),
                    ..Dep::default()
                },
            );
        }
        p
    }

    #[test]
    fn orders_dependencies_before_dependents() {
        let p = profile(&[("api", &["db", "cache"]), ("web", &["api"])], &["db", "cache"]);
        let g = build_graph(&p).unwrap();
        let order = topo_sort(&g).unwrap();

        let pos = |name: &str| order.iter().position(|n| n == name).unwrap();
        assert!(pos("db") < pos("api"));
        assert!(pos("cache") < pos("api"));
        assert!(pos("api") < pos("web"));
    }

    #[test]
    fn ordering_is_deterministic_and_lexicographic() {
        let p = profile(&[("zeta", &[]), ("alpha", &[]), ("mid", &[])], &[]);
        let g = build_graph(&p).unwrap();
        let order = topo_sort(&g).unwrap();
        assert_eq!(order, vec!["alpha", "mid", "zeta"]);

        // Stable under re-runs on the same input.
        for _ in 0..10 {
            assert_eq!(topo_sort(&build_graph(&p).unwrap()).unwrap(), order);
        }
    }

    #[test]
    fn rejects_service_dep_name_collision() {
        let p = profile(&[("db", &[])], &["db"]);
        assert_eq!(
            build_graph(&p).unwrap_err(),
            GraphError::NameCollision("db".to_owned())
        );
    }

    #[test]
    fn reports_unknown_dependency() {
        let p = profile(&[("api", &["ghost"])], &[]);
        let g = build_graph(&p).unwrap();
        assert_eq!(
            topo_sort(&g).unwrap_err(),
            GraphError::UnknownDependency {
                name: "ghost".to_owned(),
                referrer: "api".to_owned(),
            }
        );
    }

    #[test]
    fn detects_cycle_without_partial_order() {
        let p = profile(&[("a", &["b"]), ("b", &["a"])], &[]);
        let g = build_graph(&p).unwrap();
        assert_eq!(topo_sort(&g).unwrap_err(), GraphError::Cycle);
    }

    #[test]
    fn empty_profile_sorts_to_empty_order() {
        let g = build_graph(&Profile::default()).unwrap();
        assert!(topo_sort(&g).unwrap().is_empty());
    }
}
