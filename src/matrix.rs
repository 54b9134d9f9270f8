//! Expression matrices: the ordered lists of expression fragments that loop
//! variables range over.

use proc_macro2::Span;
use syn::spanned::Spanned;
use syn::{Expr, ExprArray};

/// An ordered list of opaque expression fragments.
///
/// Fragments are never evaluated; they are copied into substitution sites
/// exactly as written.
#[derive(Debug, Clone)]
pub struct ExprMatrix {
    exprs: Vec<Expr>,
    span: Span,
}

impl ExprMatrix {
    pub fn new(exprs: Vec<Expr>, span: Span) -> Self {
        Self { exprs, span }
    }

    /// Collect the elements of an array literal `[a, b, c]`.
    pub fn from_array(array: &ExprArray) -> Self {
        Self {
            exprs: array.elems.iter().cloned().collect(),
            span: array.span(),
        }
    }

    /// Accept `[..]` or `&[..]`; anything else yields `None`.
    pub fn from_initializer(expr: &Expr) -> Option<Self> {
        match expr {
            Expr::Array(array) => Some(Self::from_array(array)),
            Expr::Reference(reference) if reference.mutability.is_none() => {
                match reference.expr.as_ref() {
                    Expr::Array(array) => Some(Self::from_array(array)),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Expr> {
        self.exprs.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Expr> {
        self.exprs.iter()
    }

    /// Where the array literal was written.
    pub fn span(&self) -> Span {
        self.span
    }
}

impl<'a> IntoIterator for &'a ExprMatrix {
    type Item = &'a Expr;
    type IntoIter = std::slice::Iter<'a, Expr>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
