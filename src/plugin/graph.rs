//! Dependency graph over registered plugin names.
//!
//! Resolves the execution order for lifecycle phases via topological
//! sort, and answers the transitive-dependent queries used to skip
//! plugins downstream of a failed build.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{KilnError, Result};

/// A dependency graph keyed by plugin name.
#[derive(Debug, Default)]
pub struct PluginGraph {
    /// name -> names it depends on, in declaration order.
    dependencies: HashMap<String, Vec<String>>,

    /// name -> names that depend on it.
    dependents: HashMap<String, HashSet<String>>,

    /// Registration order; topological sort breaks ties with it so runs
    /// are deterministic.
    order: Vec<String>,
}

impl PluginGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin and its declared dependencies.
    pub fn register(&mut self, name: &str, dependencies: &[String]) {
        self.order.push(name.to_string());
        self.dependencies
            .insert(name.to_string(), dependencies.to_vec());
        for dep in dependencies {
            self.dependents
                .entry(dep.clone())
                .or_default()
                .insert(name.to_string());
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.dependencies.contains_key(name)
    }

    /// Every plugin that transitively depends on `name`.
    pub fn transitive_dependents(&self, name: &str) -> HashSet<String> {
        let mut result = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(name);

        while let Some(current) = queue.pop_front() {
            if let Some(deps) = self.dependents.get(current) {
                for dependent in deps {
                    if result.insert(dependent.clone()) {
                        queue.push_back(dependent);
                    }
                }
            }
        }

        result
    }

    /// Resolve the execution order (dependencies before dependents).
    ///
    /// Fails with [`KilnError::UnknownDependency`] if any plugin names an
    /// unregistered dependency, and [`KilnError::CyclicDependency`] if
    /// the graph contains a cycle. Both are checked before any plugin
    /// lifecycle code runs.
    pub fn resolve_order(&self) -> Result<Vec<String>> {
        for name in &self.order {
            for dep in &self.dependencies[name] {
                if !self.dependencies.contains_key(dep) {
                    return Err(KilnError::UnknownDependency {
                        plugin: name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        // Kahn's algorithm; in_degree[x] = number of unprocessed
        // dependencies of x.
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        for name in &self.order {
            in_degree.insert(name, self.dependencies[name].len());
        }

        let mut queue: VecDeque<&str> = self
            .order
            .iter()
            .filter(|name| in_degree[name.as_str()] == 0)
            .map(String::as_str)
            .collect();

        let mut result = Vec::with_capacity(self.order.len());

        while let Some(name) = queue.pop_front() {
            result.push(name.to_string());

            if let Some(dependents) = self.dependents.get(name) {
                // Follow registration order for determinism.
                for dependent in self.order.iter().filter(|n| dependents.contains(*n)) {
                    if let Some(count) = in_degree.get_mut(dependent.as_str()) {
                        *count -= 1;
                        if *count == 0 {
                            queue.push_back(dependent);
                        }
                    }
                }
            }
        }

        if result.len() != self.order.len() {
            return Err(KilnError::CyclicDependency {
                cycle: self.find_cycle().join(" -> "),
            });
        }

        Ok(result)
    }

    /// Find one cycle for error reporting.
    fn find_cycle(&self) -> Vec<String> {
        let mut visited = HashSet::new();
        let mut stack = HashSet::new();
        let mut path = Vec::new();

        for start in &self.order {
            if !visited.contains(start) {
                if let Some(cycle) = self.dfs_cycle(start, &mut visited, &mut stack, &mut path) {
                    return cycle;
                }
            }
        }

        Vec::new()
    }

    fn dfs_cycle(
        &self,
        node: &str,
        visited: &mut HashSet<String>,
        stack: &mut HashSet<String>,
        path: &mut Vec<String>,
    ) -> Option<Vec<String>> {
        visited.insert(node.to_string());
        stack.insert(node.to_string());
        path.push(node.to_string());

        if let Some(deps) = self.dependencies.get(node) {
            for dep in deps {
                if !self.dependencies.contains_key(dep.as_str()) {
                    continue;
                }
                if !visited.contains(dep) {
                    if let Some(cycle) = self.dfs_cycle(dep, visited, stack, path) {
                        return Some(cycle);
                    }
                } else if stack.contains(dep) {
                    let start = path.iter().position(|x| x == dep).unwrap();
                    let mut cycle: Vec<_> = path[start..].to_vec();
                    cycle.push(dep.clone());
                    return Some(cycle);
                }
            }
        }

        path.pop();
        stack.remove(node);
        None
    }
}
