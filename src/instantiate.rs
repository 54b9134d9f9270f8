//! Instantiation: copy a declaration template and substitute loop variables.
//!
//! A loop variable is replaced wherever it is used as a bare name:
//!
//! - expression paths `x`, including the callee of `x(..)`;
//! - type paths `T` with no generic arguments;
//! - plain identifier patterns;
//! - struct literal and struct pattern shorthand, `S { x }` becomes `S { x: .. }`;
//! - the leading segment of any other path: trait paths, bounds, struct
//!   paths and prefixes such as `x::MAX`, provided the fragment is a path;
//! - identifier tokens inside macro invocations, unless they follow `.`, `::`,
//!   `$` or a lifetime tick.
//!
//! The bound fragment is copied structurally and re-spanned to the site it
//! replaces. Later path segments (`Self::x`, `y::x`), the path after a
//! qualified self (`<T as Tr>::x`), field names, method names, macro names,
//! attribute names and declaration names are never touched.

use std::collections::HashMap;

use proc_macro2::{Delimiter, Group, Spacing, Span, TokenStream, TokenTree};
use quote::ToTokens;
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::visit_mut::{self, VisitMut};
use syn::{
    Attribute, Expr, ExprGroup, ExprPath, FieldPat, FieldValue, Macro, Meta, Pat, Path, Type,
    TypePath,
};

use crate::decl::Declaration;
use crate::error::{ExpandError, Result};

/// One combination: each loop variable bound to a single fragment.
#[derive(Debug, Clone, Default)]
pub struct SubstitutionMap<'a> {
    picks: HashMap<String, &'a Expr>,
}

impl<'a> SubstitutionMap<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, fragment: &'a Expr) {
        self.picks.insert(name.into(), fragment);
    }

    pub fn get(&self, name: &str) -> Option<&'a Expr> {
        self.picks.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.picks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.picks.is_empty()
    }

    /// The picks as rendered source text, sorted by name. Used for logging and
    /// by tests comparing combinations.
    pub fn render(&self) -> Vec<(String, String)> {
        let mut rendered: Vec<_> = self
            .picks
            .iter()
            .map(|(name, expr)| (name.clone(), expr.to_token_stream().to_string()))
            .collect();
        rendered.sort();
        rendered
    }
}

/// Copy `template` with every loop variable in `map` substituted.
pub fn instantiate<D: Declaration>(template: &D, map: &SubstitutionMap<'_>) -> Result<D> {
    let mut instance = template.clone();
    if map.is_empty() {
        return Ok(instance);
    }

    let mut substitution = Substitution {
        map,
        qualified: false,
        error: None,
    };
    instance.accept(&mut substitution);

    match substitution.error {
        Some(err) => Err(err),
        None => Ok(instance),
    }
}

struct Substitution<'m, 'a> {
    map: &'m SubstitutionMap<'a>,
    /// Set for the one path that follows a qualified self.
    qualified: bool,
    error: Option<ExpandError>,
}

impl<'a> Substitution<'_, 'a> {
    fn fragment(&self, ident: &syn::Ident) -> Option<&'a Expr> {
        self.map.get(&ident.to_string())
    }

    fn fail(&mut self, err: ExpandError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}

impl VisitMut for Substitution<'_, '_> {
    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        if self.error.is_some() {
            return;
        }
        if let Some(ident) = bare_expr_ident(expr) {
            if let Some(fragment) = self.fragment(ident) {
                let span = ident.span();
                match reparse(fragment, span, |tokens| syn::parse2::<Expr>(tokens)) {
                    Ok(replacement) => {
                        // Statement attributes sit on the leading operand.
                        let attrs = match expr {
                            Expr::Path(path) => std::mem::take(&mut path.attrs),
                            _ => Vec::new(),
                        };
                        *expr = if attrs.is_empty() {
                            grouped(replacement)
                        } else {
                            Expr::Group(ExprGroup {
                                attrs,
                                group_token: Default::default(),
                                expr: Box::new(replacement),
                            })
                        };
                    }
                    Err(err) => self.fail(err.into()),
                }
                return;
            }
        }
        visit_mut::visit_expr_mut(self, expr);
    }

    fn visit_type_mut(&mut self, ty: &mut Type) {
        if self.error.is_some() {
            return;
        }
        if let Some(ident) = bare_type_ident(ty) {
            if let Some(fragment) = self.fragment(ident) {
                let span = ident.span();
                match reparse(fragment, span, |tokens| syn::parse2::<Type>(tokens)) {
                    Ok(replacement) => *ty = replacement,
                    Err(_) => self.fail(ExpandError::UnsupportedShape {
                        what: "type substitution",
                        reason: format!(
                            "`{}` cannot be used as a type",
                            fragment.to_token_stream()
                        ),
                        span,
                    }),
                }
                return;
            }
        }
        visit_mut::visit_type_mut(self, ty);
    }

    fn visit_pat_mut(&mut self, pat: &mut Pat) {
        if self.error.is_some() {
            return;
        }
        if let Some(ident) = bare_pat_ident(pat) {
            if let Some(fragment) = self.fragment(ident) {
                let span = ident.span();
                match reparse(fragment, span, |tokens| Pat::parse_single.parse2(tokens)) {
                    Ok(replacement) => *pat = replacement,
                    Err(_) => self.fail(ExpandError::UnsupportedShape {
                        what: "pattern substitution",
                        reason: format!(
                            "`{}` cannot be used as a pattern",
                            fragment.to_token_stream()
                        ),
                        span,
                    }),
                }
                return;
            }
        }
        visit_mut::visit_pat_mut(self, pat);
    }

    fn visit_field_value_mut(&mut self, field: &mut FieldValue) {
        // `S { x }` prints only the member; spell the field out so the
        // substituted value is not lost.
        if field.colon_token.is_none() {
            if let Some(ident) = bare_expr_ident(&field.expr) {
                if self.fragment(ident).is_some() {
                    field.colon_token = Some(Default::default());
                }
            }
        }
        visit_mut::visit_field_value_mut(self, field);
    }

    fn visit_field_pat_mut(&mut self, field: &mut FieldPat) {
        if field.colon_token.is_none() {
            if let Some(ident) = bare_pat_ident(&field.pat) {
                if self.fragment(ident).is_some() {
                    field.colon_token = Some(Default::default());
                }
            }
        }
        visit_mut::visit_field_pat_mut(self, field);
    }

    fn visit_path_mut(&mut self, path: &mut Path) {
        let qualified = std::mem::take(&mut self.qualified);
        if self.error.is_some() {
            return;
        }
        if !qualified && path.leading_colon.is_none() {
            let head = match path.segments.first() {
                Some(segment) if segment.arguments.is_none() => Some(&segment.ident),
                _ => None,
            };
            if let Some(ident) = head {
                if let Some(fragment) = self.fragment(ident) {
                    let span = ident.span();
                    match splice_path(path, fragment, span) {
                        // The spliced prefix is fragment text, not template.
                        Ok(prefix_len) => {
                            for segment in path.segments.iter_mut().skip(prefix_len) {
                                self.visit_path_segment_mut(segment);
                            }
                        }
                        Err(err) => self.fail(err),
                    }
                    return;
                }
            }
        }
        visit_mut::visit_path_mut(self, path);
    }

    fn visit_expr_path_mut(&mut self, expr: &mut ExprPath) {
        if expr.qself.is_none() {
            return visit_mut::visit_expr_path_mut(self, expr);
        }
        for attr in &mut expr.attrs {
            self.visit_attribute_mut(attr);
        }
        if let Some(qself) = &mut expr.qself {
            self.visit_qself_mut(qself);
        }
        self.qualified = true;
        self.visit_path_mut(&mut expr.path);
    }

    fn visit_type_path_mut(&mut self, ty: &mut TypePath) {
        if ty.qself.is_none() {
            return visit_mut::visit_type_path_mut(self, ty);
        }
        if let Some(qself) = &mut ty.qself {
            self.visit_qself_mut(qself);
        }
        self.qualified = true;
        self.visit_path_mut(&mut ty.path);
    }

    fn visit_attribute_mut(&mut self, attr: &mut Attribute) {
        // Only the value of `#[name = value]` can refer to a loop variable.
        if let Meta::NameValue(meta) = &mut attr.meta {
            self.visit_expr_mut(&mut meta.value);
        }
    }

    fn visit_macro_mut(&mut self, mac: &mut Macro) {
        if self.error.is_some() {
            return;
        }
        let tokens = std::mem::take(&mut mac.tokens);
        mac.tokens = substitute_tokens(tokens, self.map);
    }
}

/// Replace the leading segment of `path` with the segments of `fragment`,
/// returning how many segments the fragment contributed.
fn splice_path(path: &mut Path, fragment: &Expr, span: Span) -> Result<usize> {
    let prefix: Path = reparse(fragment, span, syn::parse2).map_err(|_| {
        ExpandError::UnsupportedShape {
            what: "path substitution",
            reason: format!("`{}` cannot be used as a path", fragment.to_token_stream()),
            span,
        }
    })?;

    let generic_prefix = prefix
        .segments
        .last()
        .is_some_and(|segment| !segment.arguments.is_none());
    if path.segments.len() > 1 && generic_prefix {
        return Err(ExpandError::UnsupportedShape {
            what: "path substitution",
            reason: format!(
                "`{}` has generic arguments and cannot prefix `{}`",
                fragment.to_token_stream(),
                path.to_token_stream()
            ),
            span,
        });
    }

    let prefix_len = prefix.segments.len();
    let mut segments: Punctuated<_, _> = prefix.segments.into_iter().collect();
    segments.extend(path.segments.iter().skip(1).cloned());
    path.leading_colon = prefix.leading_colon;
    path.segments = segments;
    Ok(prefix_len)
}

fn bare_expr_ident(expr: &Expr) -> Option<&syn::Ident> {
    match expr {
        Expr::Path(path) if path.qself.is_none() => path.path.get_ident(),
        _ => None,
    }
}

fn bare_type_ident(ty: &Type) -> Option<&syn::Ident> {
    match ty {
        Type::Path(path) if path.qself.is_none() => path.path.get_ident(),
        _ => None,
    }
}

fn bare_pat_ident(pat: &Pat) -> Option<&syn::Ident> {
    match pat {
        Pat::Ident(binding)
            if binding.attrs.is_empty()
                && binding.by_ref.is_none()
                && binding.mutability.is_none()
                && binding.subpat.is_none() =>
        {
            Some(&binding.ident)
        }
        _ => None,
    }
}

/// Re-read `fragment` in another syntactic position, with every token moved
/// to `span`.
fn reparse<T>(
    fragment: &Expr,
    span: Span,
    parse: impl FnOnce(TokenStream) -> syn::Result<T>,
) -> syn::Result<T> {
    parse(respan(fragment.to_token_stream(), span))
}

fn respan(tokens: TokenStream, span: Span) -> TokenStream {
    tokens
        .into_iter()
        .map(|token| match token {
            TokenTree::Group(group) => {
                let mut respanned = Group::new(group.delimiter(), respan(group.stream(), span));
                respanned.set_span(span);
                TokenTree::Group(respanned)
            }
            mut other => {
                other.set_span(span);
                other
            }
        })
        .collect()
}

/// Wrap operator expressions in an invisible group so the precedence of the
/// substitution site cannot re-associate them.
fn grouped(expr: Expr) -> Expr {
    let needs_group = matches!(
        expr,
        Expr::Assign(_)
            | Expr::Binary(_)
            | Expr::Cast(_)
            | Expr::Closure(_)
            | Expr::Let(_)
            | Expr::Range(_)
            | Expr::Reference(_)
            | Expr::Return(_)
            | Expr::Break(_)
            | Expr::Unary(_)
            | Expr::Yield(_)
    );
    if !needs_group {
        return expr;
    }
    Expr::Group(ExprGroup {
        attrs: Vec::new(),
        group_token: Default::default(),
        expr: Box::new(expr),
    })
}

/// Token-level substitution inside macro bodies.
fn substitute_tokens(tokens: TokenStream, map: &SubstitutionMap<'_>) -> TokenStream {
    let mut out = Vec::new();
    // An identifier right after `.`, `::`, `'` or `$` is a field, method,
    // path segment, lifetime or macro metavariable rather than a bare name.
    let mut qualified = false;
    let mut joint_colon = false;

    for token in tokens {
        let (next_qualified, next_joint_colon) = match &token {
            TokenTree::Punct(p) => match p.as_char() {
                '.' | '\'' | '$' => (true, false),
                ':' => (joint_colon, p.spacing() == Spacing::Joint),
                _ => (false, false),
            },
            _ => (false, false),
        };

        match token {
            TokenTree::Ident(ident) if !qualified => match map.get(&ident.to_string()) {
                Some(fragment) => out.push(fragment_tree(fragment, ident.span())),
                None => out.push(TokenTree::Ident(ident)),
            },
            TokenTree::Group(group) => {
                let mut substituted =
                    Group::new(group.delimiter(), substitute_tokens(group.stream(), map));
                substituted.set_span(group.span());
                out.push(TokenTree::Group(substituted));
            }
            other => out.push(other),
        }

        qualified = next_qualified;
        joint_colon = next_joint_colon;
    }

    out.into_iter().collect()
}

/// A fragment as a single token tree: bare when it is one token already,
/// otherwise inside an invisible group.
fn fragment_tree(fragment: &Expr, span: Span) -> TokenTree {
    let mut trees: Vec<TokenTree> = respan(grouped(fragment.clone()).to_token_stream(), span)
        .into_iter()
        .collect();
    if trees.len() == 1 {
        if let Some(tree) = trees.pop() {
            return tree;
        }
    }
    let mut group = Group::new(Delimiter::None, trees.into_iter().collect());
    group.set_span(span);
    TokenTree::Group(group)
}
