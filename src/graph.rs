//! Converts the raw decoded association into the canonical per-file coverage views.
//!
//! A compiled unit usually mixes lines from several source files (headers, included templates).
//! The [`GraphModel`] keeps two views of them: the *instrumentation map* records every
//! instrumented line of every contributing file, while the *function map* attributes each
//! function to exactly one owning file.
//!
//! [`GraphModel`]: ./struct.GraphModel.html

use intern::Symbol;
use raw::{GraphFile, RawAssociation};

use std::collections::HashMap;

/// The canonical views of one decoded graph file.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct GraphModel {
    /// Instrumentation map: file → ascending, duplicate-free instrumented line numbers.
    ///
    /// A present key always has a non-empty line list.
    pub instrumented: HashMap<Symbol, Vec<u32>>,
    /// Function map: file → function → ascending, duplicate-free line numbers.
    ///
    /// Each function appears under exactly one file; files with no functions are absent.
    pub functions: HashMap<Symbol, HashMap<Symbol, Vec<u32>>>,
}

/// Finds the "base file" of a compiled unit: the single file referenced by the largest number
/// of functions. A tie yields no base file.
fn find_base_file(raw: &RawAssociation) -> Option<Symbol> {
    let mut refs = HashMap::new();
    for files in raw.functions.values() {
        for file in files.keys() {
            *refs.entry(*file).or_insert(0usize) += 1;
        }
    }
    let mut best: Option<(Symbol, usize)> = None;
    let mut tied = false;
    for (&file, &count) in &refs {
        match best {
            Some((_, best_count)) if count > best_count => {
                best = Some((file, count));
                tied = false;
            },
            Some((_, best_count)) if count == best_count => tied = true,
            None => best = Some((file, count)),
            _ => {},
        }
    }
    match (best, tied) {
        (Some((file, _)), false) => Some(file),
        _ => None,
    }
}

/// Builds the canonical model from a decoded graph file, consuming its raw association.
///
/// Every line a function contributed to any file lands in that file's instrumentation entry;
/// the function itself is attributed to a single owner: the base file if it contributed lines
/// there and the format allows it, otherwise the first file in the function's visitation order.
pub fn build_model(graph: GraphFile) -> GraphModel {
    let base = find_base_file(&graph.raw);
    trace!("base file of unit: {:?}", base);

    let order = graph.order;
    let mut model = GraphModel::default();
    for (function, mut files) in graph.raw.functions {
        if files.is_empty() {
            continue;
        }
        for (&file, lines) in &files {
            model.instrumented.entry(file).or_insert_with(Vec::new).extend(lines.iter().cloned());
        }
        let owner = match base {
            Some(base) if !graph.file_order_first && files.contains_key(&base) => base,
            _ => match order.first(function).or_else(|| files.keys().next().cloned()) {
                Some(owner) => owner,
                None => continue,
            },
        };
        let lines = files.remove(&owner).unwrap_or_default();
        model.functions.entry(owner).or_insert_with(HashMap::new).insert(function, lines);
    }

    cleanup(&mut model);
    model
}

/// The cleanup pass: sorts and deduplicates every line list, then drops empty functions, files
/// with no remaining functions, and empty instrumentation entries.
///
/// Applying cleanup twice yields the same model as applying it once.
pub fn cleanup(model: &mut GraphModel) {
    for lines in model.instrumented.values_mut() {
        lines.sort();
        lines.dedup();
    }
    model.instrumented.retain(|_, lines| !lines.is_empty());

    for functions in model.functions.values_mut() {
        for lines in functions.values_mut() {
            lines.sort();
            lines.dedup();
        }
        functions.retain(|_, lines| !lines.is_empty());
    }
    model.functions.retain(|_, functions| !functions.is_empty());
}
