//! Back-reference hydration.
//!
//! Records returned by a query may point at models and datasets by id.
//! Each distinct id is fetched once per top-level query and the result is
//! shared by every link to it. A link to a record that is still being
//! resolved further up the chain is left unresolved, which breaks cycles.
//! A record whose links were cut off by the depth limit is only reused at
//! the same or a greater depth; a shallower link fetches it again.

use std::collections::{HashMap, HashSet};

use futures::future::{BoxFuture, FutureExt};
use registry_core::{Dataset, Entity, EntityKind, Model, Reference};

use crate::client::RegistryClient;
use crate::query::Query;

/// Records fetched for one link target.
#[derive(Debug)]
struct Resolved<T> {
    depth: usize,
    complete: bool,
    records: Vec<T>,
}

impl<T> Resolved<T> {
    const fn usable_at(&self, depth: usize) -> bool {
        self.complete || self.depth <= depth
    }
}

/// Per-query hydration state.
#[derive(Debug)]
pub(crate) struct LinkContext {
    max_depth: usize,
    in_progress: HashSet<(EntityKind, String)>,
    truncated: bool,
    models: HashMap<String, Resolved<Model>>,
    datasets: HashMap<String, Resolved<Dataset>>,
}

impl LinkContext {
    pub(crate) fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            in_progress: HashSet::new(),
            truncated: false,
            models: HashMap::new(),
            datasets: HashMap::new(),
        }
    }
}

/// Entities that can be the target of a back-reference.
trait Linked: Entity {
    fn cache(ctx: &mut LinkContext) -> &mut HashMap<String, Resolved<Self>>;
}

impl Linked for Model {
    fn cache(ctx: &mut LinkContext) -> &mut HashMap<String, Resolved<Self>> {
        &mut ctx.models
    }
}

impl Linked for Dataset {
    fn cache(ctx: &mut LinkContext) -> &mut HashMap<String, Resolved<Self>> {
        &mut ctx.datasets
    }
}

impl RegistryClient {
    /// Attaches linked records to every back-reference of `record`.
    pub(crate) fn hydrate<'a, E: Entity>(
        &'a self,
        record: &'a mut E,
        ctx: &'a mut LinkContext,
        depth: usize,
    ) -> BoxFuture<'a, ()> {
        async move {
            for (field, slot) in record.references_mut() {
                match slot {
                    Reference::Model(link) => {
                        if let Some(records) = self.follow::<Model>(field, link.id(), ctx, depth).await {
                            link.resolve(records);
                        }
                    }
                    Reference::Dataset(link) => {
                        if let Some(records) = self.follow::<Dataset>(field, link.id(), ctx, depth).await {
                            link.resolve(records);
                        }
                    }
                    _ => {}
                }
            }
        }
        .boxed()
    }

    async fn follow<T: Linked>(
        &self,
        field: &'static str,
        id: &str,
        ctx: &mut LinkContext,
        depth: usize,
    ) -> Option<Vec<T>> {
        let hit = T::cache(ctx)
            .get(id)
            .filter(|cached| cached.usable_at(depth))
            .map(|cached| (cached.complete, cached.records.clone()));
        if let Some((complete, records)) = hit {
            ctx.truncated |= !complete;
            return Some(records);
        }

        let key = (T::KIND, id.to_string());
        if ctx.in_progress.contains(&key) {
            tracing::debug!(field, kind = %T::KIND, id, "Cyclic link left unresolved");
            return None;
        }
        if depth >= ctx.max_depth {
            tracing::debug!(field, kind = %T::KIND, id, depth, "Link depth limit reached");
            ctx.truncated = true;
            return None;
        }

        ctx.in_progress.insert(key.clone());
        let outer_truncated = std::mem::replace(&mut ctx.truncated, false);
        let resolved = match self.fetch::<T>(&Query::by_id(id)).await {
            Ok(mut records) => {
                for record in &mut records {
                    self.hydrate(record, ctx, depth + 1).await;
                }
                records
            }
            Err(e) => {
                tracing::warn!(field, kind = %T::KIND, id, error = %e, "Failed to resolve link");
                Vec::new()
            }
        };
        ctx.in_progress.remove(&key);
        let complete = !ctx.truncated;
        ctx.truncated |= outer_truncated;

        T::cache(ctx).insert(
            id.to_string(),
            Resolved {
                depth,
                complete,
                records: resolved.clone(),
            },
        );
        Some(resolved)
    }
}
