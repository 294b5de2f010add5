//! Cross-loader type identity.
//!
//! A loader constraint says that, for one class name, a set of loaders must
//! all see the same type. Constraints are recorded when a member is linked
//! across loaders, so a loader that cannot see the type yet is still held to
//! the first binding.
use classlink_types::{LoaderId, Symbol, TypeId, TypeRegistry};
use dashmap::DashMap;
use tracing::{debug, trace};

#[derive(Clone, Debug, PartialEq, Eq)]
struct ConstraintGroup {
    loaders: Vec<LoaderId>,
    bound: Option<TypeId>,
}

/// Two loaders are bound to different types for the same name.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ConstraintConflict {
    pub first: TypeId,
    pub second: TypeId,
}

#[derive(Debug, Default)]
pub struct LoaderConstraintTable {
    groups: DashMap<Symbol, Vec<ConstraintGroup>>,
}

impl LoaderConstraintTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `first` and `second` to agree on `name`. `first_type` and
    /// `second_type` are what each loader currently resolves the name to.
    pub fn add_constraint(
        &self,
        name: Symbol,
        first: LoaderId,
        first_type: Option<TypeId>,
        second: LoaderId,
        second_type: Option<TypeId>,
    ) -> Result<(), ConstraintConflict> {
        if first == second {
            return Ok(());
        }

        let mut groups = self.groups.entry(name).or_default();
        let first_group = groups.iter().position(|g| g.loaders.contains(&first));
        let second_group = groups.iter().position(|g| g.loaders.contains(&second));

        let first_type = first_type.or_else(|| first_group.and_then(|i| groups[i].bound));
        let second_type = second_type.or_else(|| second_group.and_then(|i| groups[i].bound));
        if let (Some(a), Some(b)) = (first_type, second_type) {
            if a != b {
                return Err(ConstraintConflict {
                    first: a,
                    second: b,
                });
            }
        }

        let bound = first_type.or(second_type);
        for group in [first_group, second_group].into_iter().flatten() {
            if let (Some(existing), Some(b)) = (groups[group].bound, bound) {
                if existing != b {
                    return Err(ConstraintConflict {
                        first: existing,
                        second: b,
                    });
                }
            }
        }

        match (first_group, second_group) {
            (None, None) => {
                groups.push(ConstraintGroup {
                    loaders: vec![first, second],
                    bound,
                });
            }
            (Some(i), Some(j)) if i == j => {
                groups[i].bound = groups[i].bound.or(bound);
            }
            (Some(i), None) => {
                groups[i].loaders.push(second);
                groups[i].bound = groups[i].bound.or(bound);
            }
            (None, Some(j)) => {
                groups[j].loaders.push(first);
                groups[j].bound = groups[j].bound.or(bound);
            }
            (Some(i), Some(j)) => {
                let (keep, merge) = if i < j { (i, j) } else { (j, i) };
                let merged = groups.remove(merge);
                let kept = &mut groups[keep];
                kept.loaders.extend(merged.loaders);
                kept.bound = kept.bound.or(merged.bound).or(bound);
            }
        }
        trace!(?name, %first, %second, ?bound, "added loader constraint");
        Ok(())
    }

    /// The type `loader` is constrained to see for `name`, if bound.
    pub fn constrained_type(&self, name: Symbol, loader: LoaderId) -> Option<TypeId> {
        self.groups.get(&name).and_then(|groups| {
            groups
                .iter()
                .find(|g| g.loaders.contains(&loader))
                .and_then(|g| g.bound)
        })
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Edges from a referring loader to loaders whose types it linked against.
#[derive(Debug, Default)]
pub struct LoaderDependencies {
    edges: DashMap<LoaderId, Vec<LoaderId>>,
}

impl LoaderDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `from` depends on `to`. Returns `false` when no edge is
    /// needed: either side is the bootstrap loader, or `to` is already
    /// reachable through `from`'s parent chain.
    pub fn record(&self, registry: &dyn TypeRegistry, from: LoaderId, to: LoaderId) -> bool {
        if from.is_bootstrap() || to.is_bootstrap() {
            return false;
        }
        let mut current = Some(from);
        while let Some(loader) = current {
            if loader == to {
                return false;
            }
            current = registry.loader_parent(loader);
        }

        let mut targets = self.edges.entry(from).or_default();
        if targets.contains(&to) {
            return false;
        }
        targets.push(to);
        debug!(%from, %to, "recorded loader dependency");
        true
    }

    pub fn depends_on(&self, from: LoaderId, to: LoaderId) -> bool {
        self.edges
            .get(&from)
            .is_some_and(|targets| targets.contains(&to))
    }

    pub fn dependencies_of(&self, from: LoaderId) -> Vec<LoaderId> {
        self.edges
            .get(&from)
            .map(|targets| targets.clone())
            .unwrap_or_default()
    }
}
