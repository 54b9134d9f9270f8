//! Loop descriptors: parsing `#[matrix(..)]` arguments into loop threads.
//!
//! ```text
//! #[matrix(ty = [u8, u16], n = SIZES)]
//!          ^^^^^^^^^^^^^^  ^^^^^^^^^
//!          inline matrix   scope lookup
//! ```
//!
//! Thread sources are resolved once, when the descriptor is built. A name that
//! no enclosing scope binds is fatal.

use std::collections::HashSet;

use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Attribute, ExprArray, Ident, Meta, Token};

use crate::error::{ExpandError, Result};
use crate::matrix::ExprMatrix;
use crate::scope::ScopeStack;

/// One `name = source` argument of a loop marker, before resolution.
#[derive(Debug, Clone)]
pub struct ThreadArg {
    pub name: Ident,
    pub source: ThreadSource,
}

#[derive(Debug, Clone)]
pub enum ThreadSource {
    /// `name = [a, b, c]`
    Inline(ExprArray),
    /// `name = MATRIX`, looked up in the enclosing scopes.
    Named(Ident),
}

impl Parse for ThreadArg {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let name: Ident = input.parse()?;
        input.parse::<Token![=]>()?;

        let source = if input.peek(syn::token::Bracket) {
            ThreadSource::Inline(input.parse()?)
        } else if input.peek(Ident) {
            ThreadSource::Named(input.parse()?)
        } else {
            return Err(input.error(format!(
                "`{name}` must be given an array literal or the name of a scoped matrix"
            )));
        };

        Ok(ThreadArg { name, source })
    }
}

/// One axis of the Cartesian product.
#[derive(Debug, Clone)]
pub struct LoopThread {
    pub name: Ident,
    pub values: ExprMatrix,
}

impl LoopThread {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The ordered threads of every loop marker on one declaration. Later threads
/// are inner loops.
#[derive(Debug, Clone)]
pub struct LoopDescriptor {
    pub threads: Vec<LoopThread>,
}

impl LoopDescriptor {
    /// Parse and resolve the loop markers found on one declaration.
    pub fn build(markers: &[Attribute], marker: &str, scope: &ScopeStack) -> Result<Self> {
        let mut args = Vec::new();
        for attr in markers {
            args.extend(parse_marker(attr, marker)?);
        }
        Self::resolve(args, scope)
    }

    /// Resolve already-parsed arguments against `scope`.
    pub fn resolve(args: Vec<ThreadArg>, scope: &ScopeStack) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut threads = Vec::with_capacity(args.len());

        for arg in args {
            if !seen.insert(arg.name.to_string()) {
                return Err(ExpandError::DuplicateThread {
                    name: arg.name.to_string(),
                    span: arg.name.span(),
                });
            }
            let values = match &arg.source {
                ThreadSource::Inline(array) => ExprMatrix::from_array(array),
                ThreadSource::Named(name) => scope.lookup(name)?.clone(),
            };
            threads.push(LoopThread {
                name: arg.name,
                values,
            });
        }

        Ok(LoopDescriptor { threads })
    }

    pub fn names(&self) -> Vec<String> {
        self.threads.iter().map(|t| t.name.to_string()).collect()
    }

    /// Number of combinations the descriptor enumerates, `None` on overflow.
    pub fn combinations(&self) -> Option<usize> {
        combination_count(&self.threads)
    }
}

/// Product of the thread sizes, `None` when it does not fit in `usize`.
pub fn combination_count(threads: &[LoopThread]) -> Option<usize> {
    threads
        .iter()
        .try_fold(1usize, |total, thread| total.checked_mul(thread.len()))
}

fn parse_marker(attr: &Attribute, marker: &str) -> Result<Vec<ThreadArg>> {
    let list = match &attr.meta {
        Meta::List(list) => list,
        other => {
            return Err(ExpandError::malformed_marker(
                marker,
                "expected at least one `name = [..]` argument",
                other.span(),
            ))
        }
    };

    let args = list
        .parse_args_with(Punctuated::<ThreadArg, Token![,]>::parse_terminated)
        .map_err(|err| ExpandError::malformed_marker(marker, err.to_string(), err.span()))?;

    if args.is_empty() {
        return Err(ExpandError::malformed_marker(
            marker,
            "expected at least one `name = [..]` argument",
            list.span(),
        ));
    }

    Ok(args.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ScopeFrame;
    use proc_macro2::Span;
    use syn::parse_quote;

    fn markers(item: syn::ItemFn) -> Vec<Attribute> {
        item.attrs
    }

    fn scope_with(name: &str, len: usize) -> ScopeStack {
        let exprs: Vec<syn::Expr> = (0..len).map(|i| parse_quote!(#i)).collect();
        let mut frame = ScopeFrame::new();
        frame
            .bind(
                &Ident::new(name, Span::call_site()),
                ExprMatrix::new(exprs, Span::call_site()),
            )
            .unwrap();
        let mut stack = ScopeStack::new();
        stack.push(frame);
        stack
    }

    #[test]
    fn test_inline_and_named_threads() {
        let attrs = markers(parse_quote! {
            #[matrix(a = [x, y], b = SIZES)]
            fn f() {}
        });
        let scope = scope_with("SIZES", 3);
        let descriptor = LoopDescriptor::build(&attrs, "matrix", &scope).unwrap();

        assert_eq!(descriptor.names(), vec!["a", "b"]);
        assert_eq!(descriptor.threads[0].len(), 2);
        assert_eq!(descriptor.threads[1].len(), 3);
        assert_eq!(descriptor.combinations(), Some(6));
    }

    #[test]
    fn test_threads_concatenate_across_markers() {
        let attrs = markers(parse_quote! {
            #[matrix(a = [1])]
            #[matrix(b = [2, 3])]
            fn f() {}
        });
        let descriptor = LoopDescriptor::build(&attrs, "matrix", &ScopeStack::new()).unwrap();
        assert_eq!(descriptor.names(), vec!["a", "b"]);
    }

    #[test]
    fn test_trailing_comma() {
        let attrs = markers(parse_quote! {
            #[matrix(a = [1, 2,],)]
            fn f() {}
        });
        let descriptor = LoopDescriptor::build(&attrs, "matrix", &ScopeStack::new()).unwrap();
        assert_eq!(descriptor.combinations(), Some(2));
    }

    #[test]
    fn test_undefined_name() {
        let attrs = markers(parse_quote! {
            #[matrix(a = MISSING)]
            fn f() {}
        });
        let err = LoopDescriptor::build(&attrs, "matrix", &ScopeStack::new()).unwrap_err();
        assert!(matches!(err, ExpandError::UndefinedMatrix { name, .. } if name == "MISSING"));
    }

    #[test]
    fn test_duplicate_thread() {
        let attrs = markers(parse_quote! {
            #[matrix(a = [1], a = [2])]
            fn f() {}
        });
        let err = LoopDescriptor::build(&attrs, "matrix", &ScopeStack::new()).unwrap_err();
        assert!(matches!(err, ExpandError::DuplicateThread { name, .. } if name == "a"));
    }

    #[test]
    fn test_requires_arguments() {
        for attrs in [
            markers(parse_quote! { #[matrix] fn f() {} }),
            markers(parse_quote! { #[matrix()] fn f() {} }),
            markers(parse_quote! { #[matrix = "a"] fn f() {} }),
        ] {
            let err = LoopDescriptor::build(&attrs, "matrix", &ScopeStack::new()).unwrap_err();
            assert!(matches!(err, ExpandError::MalformedMarker { .. }), "{err}");
        }
    }

    #[test]
    fn test_rejects_other_sources() {
        let attrs = markers(parse_quote! {
            #[matrix(a = 1..4)]
            fn f() {}
        });
        let err = LoopDescriptor::build(&attrs, "matrix", &ScopeStack::new()).unwrap_err();
        assert!(err.to_string().contains("array literal"));
    }
}
