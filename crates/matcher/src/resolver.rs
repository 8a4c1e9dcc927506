use std::sync::Arc;

use rayon::prelude::*;

use crate::search::TextSearcher;
use crate::types::ContextResultSet;

/// Runs each context through the searcher independently.
#[derive(Clone)]
pub struct ContextResolver {
    searcher: Arc<dyn TextSearcher>,
    parallel: bool,
}

impl ContextResolver {
    pub fn new(searcher: Arc<dyn TextSearcher>) -> Self {
        Self {
            searcher,
            parallel: true,
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Non-blank contexts, trimmed, in input order.
    pub fn valid_contexts<S: AsRef<str>>(contexts: &[S]) -> Vec<&str> {
        contexts
            .iter()
            .map(|c| c.as_ref().trim())
            .filter(|c| !c.is_empty())
            .collect()
    }

    /// One result set per non-blank context, in input order. A context whose
    /// search fails contributes an empty set.
    pub fn resolve<S: AsRef<str> + Sync>(
        &self,
        contexts: &[S],
        search_k: usize,
    ) -> Vec<ContextResultSet> {
        let valid = Self::valid_contexts(contexts);
        let total = valid.len();

        if self.parallel && total > 1 {
            valid
                .par_iter()
                .enumerate()
                .map(|(slot, context)| self.resolve_one(slot, total, context, search_k))
                .collect()
        } else {
            valid
                .iter()
                .enumerate()
                .map(|(slot, context)| self.resolve_one(slot, total, context, search_k))
                .collect()
        }
    }

    fn resolve_one(
        &self,
        slot: usize,
        total: usize,
        context: &str,
        search_k: usize,
    ) -> ContextResultSet {
        match self.searcher.search_text(context, search_k) {
            Ok(items) => {
                tracing::debug!(
                    context = slot + 1,
                    of = total,
                    k = search_k,
                    results = items.len(),
                    "context searched"
                );
                items
            }
            Err(err) => {
                tracing::error!(
                    context = slot + 1,
                    of = total,
                    error = %err,
                    "context search failed, treating as no results"
                );
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for ContextResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextResolver")
            .field("parallel", &self.parallel)
            .finish_non_exhaustive()
    }
}
