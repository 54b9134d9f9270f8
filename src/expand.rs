//! Cartesian expansion of a declaration template over its loop threads.
//!
//! For threads `T1..Tk` of sizes `n1..nk` the template is instantiated
//! `n1 × … × nk` times. Combinations are enumerated in row-major order: the
//! last thread varies fastest, exactly as if the threads were nested loops
//! written in argument order.
//!
//! ```text
//! #[matrix(a = [x, y], b = [1, 2, 3])]
//!   → (x,1) (x,2) (x,3) (y,1) (y,2) (y,3)
//! ```

use proc_macro2::Span;
use tracing::{debug, warn};

use crate::config::EmptyMatrixPolicy;
use crate::decl::Declaration;
use crate::descriptor::{combination_count, LoopThread};
use crate::error::{ExpandError, Result};
use crate::instantiate::{instantiate, SubstitutionMap};

/// Iterator over every combination of thread picks, last thread fastest.
pub struct Combinations<'a> {
    threads: &'a [LoopThread],
    cursor: Vec<usize>,
    done: bool,
}

/// Enumerate the Cartesian product of `threads`.
///
/// Yields nothing when any thread is empty. With no threads at all it yields a
/// single empty map.
pub fn combinations(threads: &[LoopThread]) -> Combinations<'_> {
    Combinations {
        threads,
        cursor: vec![0; threads.len()],
        done: threads.iter().any(LoopThread::is_empty),
    }
}

impl<'a> Iterator for Combinations<'a> {
    type Item = SubstitutionMap<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let threads = self.threads;
        let mut map = SubstitutionMap::new();
        for (thread, &index) in threads.iter().zip(&self.cursor) {
            let fragment = thread.values.get(index)?;
            map.insert(thread.name.to_string(), fragment);
        }

        // Advance the odometer; when every axis wraps we are finished.
        self.done = true;
        for axis in (0..threads.len()).rev() {
            self.cursor[axis] += 1;
            if self.cursor[axis] < threads[axis].len() {
                self.done = false;
                break;
            }
            self.cursor[axis] = 0;
        }

        Some(map)
    }
}

/// Instantiate `template` once per combination of `threads`.
///
/// The template must already have its loop markers stripped.
pub fn expand_template<D: Declaration>(
    template: &D,
    threads: &[LoopThread],
    policy: EmptyMatrixPolicy,
) -> Result<Vec<D>> {
    if let Some(empty) = threads.iter().find(|t| t.is_empty()) {
        match policy {
            EmptyMatrixPolicy::Reject => {
                return Err(ExpandError::EmptyMatrix {
                    name: empty.name.to_string(),
                    span: empty.name.span(),
                })
            }
            EmptyMatrixPolicy::Allow => {
                warn!(
                    thread = %empty.name,
                    kind = template.kind(),
                    "empty matrix, declaration expands to nothing"
                );
                return Ok(Vec::new());
            }
        }
    }

    let Some(total) = combination_count(threads) else {
        return Err(ExpandError::TooManyCombinations {
            span: threads
                .first()
                .map_or_else(Span::call_site, |thread| thread.name.span()),
        });
    };
    let mut instances = Vec::with_capacity(total);
    for map in combinations(threads) {
        instances.push(instantiate(template, &map)?);
    }

    debug!(
        threads = ?threads.iter().map(|t| t.name.to_string()).collect::<Vec<_>>(),
        instances = instances.len(),
        kind = template.kind(),
        "expanded loop marker"
    );
    Ok(instances)
}
