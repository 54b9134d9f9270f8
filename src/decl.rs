//! Declarations: the members of block-like containers.
//!
//! The driver only needs three things from a member: its attribute list, the
//! names it binds when it carries the scope marker, and a way to hand it to a
//! `syn` visitor. [`Declaration`] captures exactly that for the four member
//! kinds that appear in Rust containers.

use quote::ToTokens;
use syn::spanned::Spanned;
use syn::visit::Visit;
use syn::visit_mut::VisitMut;
use syn::{Attribute, Expr, ExprRange, ImplItem, Item, Local, Pat, Stmt, TraitItem};

use crate::error::{ExpandError, Result};
use crate::matrix::ExprMatrix;

/// One scope binding found on a declaration: `NAME = [..]`.
#[derive(Debug, Clone)]
pub struct Binding {
    pub name: syn::Ident,
    pub matrix: ExprMatrix,
}

pub trait Declaration: Clone + ToTokens {
    /// Human-readable name of the declaration kind, used in diagnostics.
    fn kind(&self) -> &'static str;

    /// The attribute list, or `None` for shapes that cannot carry attributes.
    fn attrs(&self) -> Option<&[Attribute]>;

    /// Replace the attribute list. Shapes without one ignore the call.
    fn set_attrs(&mut self, attrs: Vec<Attribute>);

    /// Names this declaration binds as a scope carrier. The marker itself has
    /// already been stripped; `marker` is only used in diagnostics.
    fn scope_bindings(&self, marker: &str) -> Result<Vec<Binding>>;

    fn accept<V: VisitMut>(&mut self, visitor: &mut V);

    /// Read-only counterpart of [`Declaration::accept`].
    fn inspect<'ast, V: Visit<'ast>>(&'ast self, visitor: &mut V);
}

impl Declaration for Item {
    fn kind(&self) -> &'static str {
        "item"
    }

    fn attrs(&self) -> Option<&[Attribute]> {
        let attrs = match self {
            Item::Const(i) => &i.attrs,
            Item::Enum(i) => &i.attrs,
            Item::ExternCrate(i) => &i.attrs,
            Item::Fn(i) => &i.attrs,
            Item::ForeignMod(i) => &i.attrs,
            Item::Impl(i) => &i.attrs,
            Item::Macro(i) => &i.attrs,
            Item::Mod(i) => &i.attrs,
            Item::Static(i) => &i.attrs,
            Item::Struct(i) => &i.attrs,
            Item::Trait(i) => &i.attrs,
            Item::TraitAlias(i) => &i.attrs,
            Item::Type(i) => &i.attrs,
            Item::Union(i) => &i.attrs,
            Item::Use(i) => &i.attrs,
            _ => return None,
        };
        Some(attrs.as_slice())
    }

    fn set_attrs(&mut self, attrs: Vec<Attribute>) {
        let slot = match self {
            Item::Const(i) => &mut i.attrs,
            Item::Enum(i) => &mut i.attrs,
            Item::ExternCrate(i) => &mut i.attrs,
            Item::Fn(i) => &mut i.attrs,
            Item::ForeignMod(i) => &mut i.attrs,
            Item::Impl(i) => &mut i.attrs,
            Item::Macro(i) => &mut i.attrs,
            Item::Mod(i) => &mut i.attrs,
            Item::Static(i) => &mut i.attrs,
            Item::Struct(i) => &mut i.attrs,
            Item::Trait(i) => &mut i.attrs,
            Item::TraitAlias(i) => &mut i.attrs,
            Item::Type(i) => &mut i.attrs,
            Item::Union(i) => &mut i.attrs,
            Item::Use(i) => &mut i.attrs,
            _ => return,
        };
        *slot = attrs;
    }

    fn scope_bindings(&self, marker: &str) -> Result<Vec<Binding>> {
        match self {
            Item::Const(i) => single_binding(marker, &i.ident, &i.expr),
            Item::Static(i) => single_binding(marker, &i.ident, &i.expr),
            other => Err(ExpandError::malformed_scope(
                marker,
                "expected a `const` or `static` initialized with an array literal",
                other.span(),
            )),
        }
    }

    fn accept<V: VisitMut>(&mut self, visitor: &mut V) {
        visitor.visit_item_mut(self);
    }

    fn inspect<'ast, V: Visit<'ast>>(&'ast self, visitor: &mut V) {
        visitor.visit_item(self);
    }
}

impl Declaration for ImplItem {
    fn kind(&self) -> &'static str {
        "impl item"
    }

    fn attrs(&self) -> Option<&[Attribute]> {
        let attrs = match self {
            ImplItem::Const(i) => &i.attrs,
            ImplItem::Fn(i) => &i.attrs,
            ImplItem::Type(i) => &i.attrs,
            ImplItem::Macro(i) => &i.attrs,
            _ => return None,
        };
        Some(attrs.as_slice())
    }

    fn set_attrs(&mut self, attrs: Vec<Attribute>) {
        let slot = match self {
            ImplItem::Const(i) => &mut i.attrs,
            ImplItem::Fn(i) => &mut i.attrs,
            ImplItem::Type(i) => &mut i.attrs,
            ImplItem::Macro(i) => &mut i.attrs,
            _ => return,
        };
        *slot = attrs;
    }

    fn scope_bindings(&self, marker: &str) -> Result<Vec<Binding>> {
        match self {
            ImplItem::Const(i) => single_binding(marker, &i.ident, &i.expr),
            other => Err(ExpandError::malformed_scope(
                marker,
                "expected an associated `const` initialized with an array literal",
                other.span(),
            )),
        }
    }

    fn accept<V: VisitMut>(&mut self, visitor: &mut V) {
        visitor.visit_impl_item_mut(self);
    }

    fn inspect<'ast, V: Visit<'ast>>(&'ast self, visitor: &mut V) {
        visitor.visit_impl_item(self);
    }
}

impl Declaration for TraitItem {
    fn kind(&self) -> &'static str {
        "trait item"
    }

    fn attrs(&self) -> Option<&[Attribute]> {
        let attrs = match self {
            TraitItem::Const(i) => &i.attrs,
            TraitItem::Fn(i) => &i.attrs,
            TraitItem::Type(i) => &i.attrs,
            TraitItem::Macro(i) => &i.attrs,
            _ => return None,
        };
        Some(attrs.as_slice())
    }

    fn set_attrs(&mut self, attrs: Vec<Attribute>) {
        let slot = match self {
            TraitItem::Const(i) => &mut i.attrs,
            TraitItem::Fn(i) => &mut i.attrs,
            TraitItem::Type(i) => &mut i.attrs,
            TraitItem::Macro(i) => &mut i.attrs,
            _ => return,
        };
        *slot = attrs;
    }

    fn scope_bindings(&self, marker: &str) -> Result<Vec<Binding>> {
        match self {
            TraitItem::Const(i) => match &i.default {
                Some((_, expr)) => single_binding(marker, &i.ident, expr),
                None => Err(ExpandError::malformed_scope(
                    marker,
                    format!("`{}` has no initializer", i.ident),
                    i.ident.span(),
                )),
            },
            other => Err(ExpandError::malformed_scope(
                marker,
                "expected an associated `const` with an array literal default",
                other.span(),
            )),
        }
    }

    fn accept<V: VisitMut>(&mut self, visitor: &mut V) {
        visitor.visit_trait_item_mut(self);
    }

    fn inspect<'ast, V: Visit<'ast>>(&'ast self, visitor: &mut V) {
        visitor.visit_trait_item(self);
    }
}

impl Declaration for Stmt {
    fn kind(&self) -> &'static str {
        "statement"
    }

    fn attrs(&self) -> Option<&[Attribute]> {
        match self {
            Stmt::Local(local) => Some(local.attrs.as_slice()),
            Stmt::Item(item) => item.attrs(),
            Stmt::Macro(mac) => Some(mac.attrs.as_slice()),
            Stmt::Expr(expr, _) => expr_attrs(expr),
        }
    }

    fn set_attrs(&mut self, attrs: Vec<Attribute>) {
        match self {
            Stmt::Local(local) => local.attrs = attrs,
            Stmt::Item(item) => item.set_attrs(attrs),
            Stmt::Macro(mac) => mac.attrs = attrs,
            Stmt::Expr(expr, _) => {
                if let Some(slot) = expr_attrs_mut(expr) {
                    *slot = attrs;
                }
            }
        }
    }

    fn scope_bindings(&self, marker: &str) -> Result<Vec<Binding>> {
        match self {
            Stmt::Local(local) => local_bindings(marker, local),
            Stmt::Item(item) => item.scope_bindings(marker),
            other => Err(ExpandError::malformed_scope(
                marker,
                "expected a `let` binding initialized with an array literal",
                other.span(),
            )),
        }
    }

    fn accept<V: VisitMut>(&mut self, visitor: &mut V) {
        visitor.visit_stmt_mut(self);
    }

    fn inspect<'ast, V: Visit<'ast>>(&'ast self, visitor: &mut V) {
        visitor.visit_stmt(self);
    }
}

fn single_binding(marker: &str, name: &syn::Ident, init: &Expr) -> Result<Vec<Binding>> {
    let matrix = ExprMatrix::from_initializer(init).ok_or_else(|| {
        ExpandError::malformed_scope(
            marker,
            format!("`{name}` must be initialized with an array literal"),
            init.span(),
        )
    })?;
    Ok(vec![Binding {
        name: name.clone(),
        matrix,
    }])
}

/// `let xs = [..];`, `let xs: T = [..];` or `let (xs, ys) = ([..], [..]);`
fn local_bindings(marker: &str, local: &Local) -> Result<Vec<Binding>> {
    let init = match &local.init {
        Some(init) if init.diverge.is_none() => &init.expr,
        Some(init) => {
            return Err(ExpandError::malformed_scope(
                marker,
                "`let .. else` cannot bind a matrix",
                init.expr.span(),
            ))
        }
        None => {
            return Err(ExpandError::malformed_scope(
                marker,
                "binding has no initializer",
                local.pat.span(),
            ))
        }
    };
    pattern_bindings(marker, &local.pat, init)
}

fn pattern_bindings(marker: &str, pat: &Pat, init: &Expr) -> Result<Vec<Binding>> {
    match pat {
        Pat::Type(typed) => pattern_bindings(marker, &typed.pat, init),
        Pat::Ident(binding) if binding.subpat.is_none() && binding.by_ref.is_none() => {
            single_binding(marker, &binding.ident, init)
        }
        Pat::Tuple(tuple) => {
            let Expr::Tuple(values) = init else {
                return Err(ExpandError::malformed_scope(
                    marker,
                    "a tuple pattern must be initialized with a tuple of array literals",
                    init.span(),
                ));
            };
            if tuple.elems.len() != values.elems.len() {
                return Err(ExpandError::malformed_scope(
                    marker,
                    format!(
                        "pattern binds {} names but the initializer has {} arrays",
                        tuple.elems.len(),
                        values.elems.len()
                    ),
                    init.span(),
                ));
            }
            let mut bindings = Vec::with_capacity(tuple.elems.len());
            for (pat, value) in tuple.elems.iter().zip(&values.elems) {
                bindings.extend(pattern_bindings(marker, pat, value)?);
            }
            Ok(bindings)
        }
        other => Err(ExpandError::malformed_scope(
            marker,
            "only plain names and tuples of names can be bound",
            other.span(),
        )),
    }
}

/// The operand that holds a statement's outer attributes.
///
/// `#[attr] a += b * c;` parses with the attribute on `a`: syn attaches outer
/// attributes to the leftmost operand of binary, assignment, cast and range
/// expressions.
fn leading_operand(expr: &Expr) -> &Expr {
    match expr {
        Expr::Assign(e) => leading_operand(&e.left),
        Expr::Binary(e) => leading_operand(&e.left),
        Expr::Cast(e) => leading_operand(&e.expr),
        Expr::Range(ExprRange {
            start: Some(start), ..
        }) => leading_operand(start),
        other => other,
    }
}

fn leading_operand_mut(expr: &mut Expr) -> &mut Expr {
    match expr {
        Expr::Assign(e) => leading_operand_mut(&mut e.left),
        Expr::Binary(e) => leading_operand_mut(&mut e.left),
        Expr::Cast(e) => leading_operand_mut(&mut e.expr),
        Expr::Range(ExprRange {
            start: Some(start), ..
        }) => leading_operand_mut(start),
        other => other,
    }
}

/// Attribute list of an expression statement.
fn expr_attrs(expr: &Expr) -> Option<&[Attribute]> {
    let attrs = match leading_operand(expr) {
        Expr::Array(e) => &e.attrs,
        Expr::Assign(e) => &e.attrs,
        Expr::Async(e) => &e.attrs,
        Expr::Await(e) => &e.attrs,
        Expr::Binary(e) => &e.attrs,
        Expr::Block(e) => &e.attrs,
        Expr::Break(e) => &e.attrs,
        Expr::Call(e) => &e.attrs,
        Expr::Cast(e) => &e.attrs,
        Expr::Closure(e) => &e.attrs,
        Expr::Const(e) => &e.attrs,
        Expr::Continue(e) => &e.attrs,
        Expr::Field(e) => &e.attrs,
        Expr::ForLoop(e) => &e.attrs,
        Expr::Group(e) => &e.attrs,
        Expr::If(e) => &e.attrs,
        Expr::Index(e) => &e.attrs,
        Expr::Infer(e) => &e.attrs,
        Expr::Let(e) => &e.attrs,
        Expr::Lit(e) => &e.attrs,
        Expr::Loop(e) => &e.attrs,
        Expr::Macro(e) => &e.attrs,
        Expr::Match(e) => &e.attrs,
        Expr::MethodCall(e) => &e.attrs,
        Expr::Paren(e) => &e.attrs,
        Expr::Path(e) => &e.attrs,
        Expr::Range(e) => &e.attrs,
        Expr::Reference(e) => &e.attrs,
        Expr::Repeat(e) => &e.attrs,
        Expr::Return(e) => &e.attrs,
        Expr::Struct(e) => &e.attrs,
        Expr::Try(e) => &e.attrs,
        Expr::TryBlock(e) => &e.attrs,
        Expr::Tuple(e) => &e.attrs,
        Expr::Unary(e) => &e.attrs,
        Expr::Unsafe(e) => &e.attrs,
        Expr::While(e) => &e.attrs,
        Expr::Yield(e) => &e.attrs,
        _ => return None,
    };
    Some(attrs.as_slice())
}

fn expr_attrs_mut(expr: &mut Expr) -> Option<&mut Vec<Attribute>> {
    let attrs = match leading_operand_mut(expr) {
        Expr::Array(e) => &mut e.attrs,
        Expr::Assign(e) => &mut e.attrs,
        Expr::Async(e) => &mut e.attrs,
        Expr::Await(e) => &mut e.attrs,
        Expr::Binary(e) => &mut e.attrs,
        Expr::Block(e) => &mut e.attrs,
        Expr::Break(e) => &mut e.attrs,
        Expr::Call(e) => &mut e.attrs,
        Expr::Cast(e) => &mut e.attrs,
        Expr::Closure(e) => &mut e.attrs,
        Expr::Const(e) => &mut e.attrs,
        Expr::Continue(e) => &mut e.attrs,
        Expr::Field(e) => &mut e.attrs,
        Expr::ForLoop(e) => &mut e.attrs,
        Expr::Group(e) => &mut e.attrs,
        Expr::If(e) => &mut e.attrs,
        Expr::Index(e) => &mut e.attrs,
        Expr::Infer(e) => &mut e.attrs,
        Expr::Let(e) => &mut e.attrs,
        Expr::Lit(e) => &mut e.attrs,
        Expr::Loop(e) => &mut e.attrs,
        Expr::Macro(e) => &mut e.attrs,
        Expr::Match(e) => &mut e.attrs,
        Expr::MethodCall(e) => &mut e.attrs,
        Expr::Paren(e) => &mut e.attrs,
        Expr::Path(e) => &mut e.attrs,
        Expr::Range(e) => &mut e.attrs,
        Expr::Reference(e) => &mut e.attrs,
        Expr::Repeat(e) => &mut e.attrs,
        Expr::Return(e) => &mut e.attrs,
        Expr::Struct(e) => &mut e.attrs,
        Expr::Try(e) => &mut e.attrs,
        Expr::TryBlock(e) => &mut e.attrs,
        Expr::Tuple(e) => &mut e.attrs,
        Expr::Unary(e) => &mut e.attrs,
        Expr::Unsafe(e) => &mut e.attrs,
        Expr::While(e) => &mut e.attrs,
        Expr::Yield(e) => &mut e.attrs,
        _ => return None,
    };
    Some(attrs)
}
