//! Tree rewrite driver
//!
//! Walks block-like containers and rewrites their member lists in place.
//!
//! ## Member processing
//!
//! Members of one block are handled in source order:
//!
//! 1. A scope declaration (`#[scope] const N: [T; 2] = [..];`) binds its names
//!    for the siblings that follow it and is dropped from the output.
//! 2. Any other member first has its own nested blocks rewritten, with the
//!    bindings visible at that point, then its loop markers expanded. The
//!    expanded instances replace the member in order.
//! 3. Members without markers are kept as they are.
//!
//! Frames bound inside a block are released when the block is done, through
//! a [`BlockScope`](crate::scope::BlockScope) guard, so an error halfway
//! through a block never leaks bindings into its ancestors.
//!
//! ## Stray markers
//!
//! Markers only make sense on container members. Once the tree is rewritten,
//! any marker left behind (on a struct field, a match arm, a parameter) is an
//! error instead of silently reaching the compiler. Macro bodies are opaque
//! token streams the driver never rewrites, so a `#[marker ..]` found in one
//! is rejected the same way.

use proc_macro2::{Delimiter, Span, TokenStream, TokenTree};
use syn::spanned::Spanned;
use syn::visit::Visit;
use syn::visit_mut::VisitMut;
use syn::{Attribute, Block, ItemImpl, ItemMod, ItemTrait, Macro};
use tracing::{debug, trace};

use crate::attrs::{extract_attrs, is_doc, Extracted};
use crate::config::ExpandConfig;
use crate::decl::Declaration;
use crate::descriptor::LoopDescriptor;
use crate::error::{ExpandError, Result};
use crate::expand::expand_template;
use crate::scope::{ScopeFrame, ScopeStack};

/// Rewrite one top-level member list and reject any marker left behind.
pub fn expand_members<D: Declaration>(members: Vec<D>, config: &ExpandConfig) -> Result<Vec<D>> {
    let mut scope = ScopeStack::new();
    let members = rewrite_members(members, &mut scope, config)?;
    check_stray_markers(&members, config)?;
    Ok(members)
}

/// Rewrite the members of one block against `scope`.
///
/// Frames pushed while walking the block are gone again when this returns.
pub fn rewrite_members<D: Declaration>(
    members: Vec<D>,
    scope: &mut ScopeStack,
    config: &ExpandConfig,
) -> Result<Vec<D>> {
    let mut block = scope.enter_block();
    trace!(members = members.len(), depth = block.depth(), "rewriting block");

    let mut output = Vec::with_capacity(members.len());
    for mut member in members {
        let scope_markers = member
            .attrs()
            .and_then(|attrs| extract_attrs(attrs, |attr| config.is_scope_marker(attr)));
        if let Some(extracted) = scope_markers {
            bind_scope(&member, extracted, &mut block, config)?;
            continue;
        }

        rewrite_nested(&mut member, &mut block, config)?;

        let loop_markers = member
            .attrs()
            .and_then(|attrs| extract_attrs(attrs, |attr| config.is_loop_marker(attr)));
        match loop_markers {
            None => output.push(member),
            Some(extracted) => {
                let descriptor =
                    LoopDescriptor::build(&extracted.matches, &config.loop_marker, &block)?;
                member.set_attrs(extracted.remaining);
                output.extend(expand_template(
                    &member,
                    &descriptor.threads,
                    config.empty_matrix,
                )?);
            }
        }
    }

    Ok(output)
}

fn bind_scope<D: Declaration>(
    member: &D,
    extracted: Extracted,
    scope: &mut ScopeStack,
    config: &ExpandConfig,
) -> Result<()> {
    for marker in &extracted.matches {
        if marker.meta.require_path_only().is_err() {
            return Err(ExpandError::malformed_marker(
                &config.scope_marker,
                "takes no arguments",
                marker.span(),
            ));
        }
    }
    if let Some(marker) = extracted
        .remaining
        .iter()
        .find(|attr| config.is_loop_marker(attr))
    {
        return Err(ExpandError::malformed_scope(
            &config.scope_marker,
            format!("a scope declaration cannot also carry #[{}]", config.loop_marker),
            marker.span(),
        ));
    }

    let mut frame = ScopeFrame::new();
    for binding in member.scope_bindings(&config.scope_marker)? {
        frame.bind(&binding.name, binding.matrix)?;
    }

    debug!(
        bindings = ?frame.names().collect::<Vec<_>>(),
        depth = scope.depth(),
        "bound scope"
    );
    scope.push(frame);
    Ok(())
}

fn rewrite_nested<D: Declaration>(
    member: &mut D,
    scope: &mut ScopeStack,
    config: &ExpandConfig,
) -> Result<()> {
    let mut rewriter = NestedRewriter {
        scope,
        config,
        error: None,
    };
    member.accept(&mut rewriter);
    match rewriter.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Finds the block-like containers inside one member and hands their member
/// lists back to [`rewrite_members`]. The first error stops all further work.
struct NestedRewriter<'s, 'c> {
    scope: &'s mut ScopeStack,
    config: &'c ExpandConfig,
    error: Option<ExpandError>,
}

impl NestedRewriter<'_, '_> {
    fn rewrite<D: Declaration>(&mut self, members: &mut Vec<D>) {
        if self.error.is_some() {
            return;
        }
        match rewrite_members(std::mem::take(members), self.scope, self.config) {
            Ok(rewritten) => *members = rewritten,
            Err(err) => self.error = Some(err),
        }
    }
}

impl VisitMut for NestedRewriter<'_, '_> {
    fn visit_block_mut(&mut self, block: &mut Block) {
        self.rewrite(&mut block.stmts);
    }

    fn visit_item_mod_mut(&mut self, module: &mut ItemMod) {
        if let Some((_, items)) = &mut module.content {
            self.rewrite(items);
        }
    }

    fn visit_item_impl_mut(&mut self, imp: &mut ItemImpl) {
        self.rewrite(&mut imp.items);
    }

    fn visit_item_trait_mut(&mut self, tr: &mut ItemTrait) {
        self.rewrite(&mut tr.items);
    }
}

fn check_stray_markers<D: Declaration>(members: &[D], config: &ExpandConfig) -> Result<()> {
    let mut finder = StrayMarkers {
        config,
        found: None,
    };
    for member in members {
        member.inspect(&mut finder);
        if let Some(err) = finder.found.take() {
            return Err(err);
        }
    }
    Ok(())
}

struct StrayMarkers<'c> {
    config: &'c ExpandConfig,
    found: Option<ExpandError>,
}

impl StrayMarkers<'_> {
    fn report(&mut self, marker: String, span: Span) {
        self.found = Some(ExpandError::StrayMarker { marker, span });
    }

    /// Look for `#[marker ..]` and `#![marker ..]` by token shape.
    fn scan_tokens(&mut self, tokens: TokenStream) {
        let mut after_pound = false;
        for tree in tokens {
            if self.found.is_some() {
                return;
            }
            match tree {
                TokenTree::Punct(punct) if punct.as_char() == '#' => {
                    after_pound = true;
                    continue;
                }
                TokenTree::Punct(punct) if punct.as_char() == '!' && after_pound => continue,
                TokenTree::Group(group) => {
                    if after_pound && group.delimiter() == Delimiter::Bracket {
                        if let Some(marker) = self.marker_named(group.stream()) {
                            self.report(marker, group.span());
                            return;
                        }
                    }
                    self.scan_tokens(group.stream());
                }
                _ => {}
            }
            after_pound = false;
        }
    }

    fn marker_named(&self, attr: TokenStream) -> Option<String> {
        let mut tokens = attr.into_iter();
        let Some(TokenTree::Ident(ident)) = tokens.next() else {
            return None;
        };
        // `#[marker::other]` is a different attribute.
        if matches!(tokens.next(), Some(TokenTree::Punct(punct)) if punct.as_char() == ':') {
            return None;
        }
        if ident == self.config.scope_marker {
            Some(self.config.scope_marker.clone())
        } else if ident == self.config.loop_marker {
            Some(self.config.loop_marker.clone())
        } else {
            None
        }
    }
}

impl<'ast> Visit<'ast> for StrayMarkers<'_> {
    fn visit_attribute(&mut self, attr: &'ast Attribute) {
        if self.found.is_some() || is_doc(attr) {
            return;
        }
        let marker = if self.config.is_scope_marker(attr) {
            &self.config.scope_marker
        } else if self.config.is_loop_marker(attr) {
            &self.config.loop_marker
        } else {
            return;
        };
        self.report(marker.clone(), attr.span());
    }

    fn visit_macro(&mut self, mac: &'ast Macro) {
        if self.found.is_none() {
            self.scan_tokens(mac.tokens.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quote::ToTokens;
    use syn::{parse_quote, Item};

    fn expand(file: syn::File) -> Result<Vec<Item>> {
        expand_members(file.items, &ExpandConfig::default())
    }

    fn render(items: &[Item]) -> String {
        items
            .iter()
            .map(|item| item.to_token_stream().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn expected(file: syn::File) -> String {
        render(&file.items)
    }

    #[test]
    fn test_scope_binds_following_siblings() {
        let items = expand(parse_quote! {
            #[scope]
            const WIDTHS: [u32; 2] = [8, 16];

            #[matrix(w = WIDTHS)]
            const _: u32 = w;
        })
        .unwrap();

        assert_eq!(
            render(&items),
            expected(parse_quote! {
                const _: u32 = 8;
                const _: u32 = 16;
            })
        );
    }

    #[test]
    fn test_scope_is_not_visible_to_earlier_siblings() {
        let err = expand(parse_quote! {
            #[matrix(w = WIDTHS)]
            const _: u32 = w;

            #[scope]
            const WIDTHS: [u32; 2] = [8, 16];
        })
        .unwrap_err();
        assert!(matches!(err, ExpandError::UndefinedMatrix { name, .. } if name == "WIDTHS"));
    }

    #[test]
    fn test_let_scope_inside_function() {
        let items = expand(parse_quote! {
            fn run(out: &mut Vec<i32>) {
                #[scope]
                let values = [1, 2];

                #[matrix(v = values)]
                out.push(v);
            }
        })
        .unwrap();

        assert_eq!(
            render(&items),
            expected(parse_quote! {
                fn run(out: &mut Vec<i32>) {
                    out.push(1);
                    out.push(2);
                }
            })
        );
    }

    #[test]
    fn test_impl_members_expand() {
        let items = expand(parse_quote! {
            impl Lanes {
                #[scope]
                const WIDTHS: [usize; 2] = [4, 8];

                #[matrix(w = WIDTHS)]
                pub fn width(&self) -> usize { w }
            }
        })
        .unwrap();

        assert_eq!(
            render(&items),
            expected(parse_quote! {
                impl Lanes {
                    pub fn width(&self) -> usize { 4 }
                    pub fn width(&self) -> usize { 8 }
                }
            })
        );
    }

    #[test]
    fn test_scope_with_arguments_is_malformed() {
        let err = expand(parse_quote! {
            #[scope(extra)]
            const A: [u8; 1] = [1];
        })
        .unwrap_err();
        assert!(matches!(err, ExpandError::MalformedMarker { .. }), "{err}");
    }

    #[test]
    fn test_scope_cannot_also_loop() {
        let err = expand(parse_quote! {
            #[scope]
            #[matrix(n = [1])]
            const A: [u8; 1] = [n];
        })
        .unwrap_err();
        assert!(matches!(err, ExpandError::MalformedScope { .. }), "{err}");
    }

    #[test]
    fn test_stray_marker_on_field() {
        let err = expand(parse_quote! {
            struct S {
                #[matrix(n = [1, 2])]
                field: u8,
            }
        })
        .unwrap_err();
        assert!(matches!(err, ExpandError::StrayMarker { marker, .. } if marker == "matrix"));
    }

    #[test]
    fn test_marker_inside_macro_body_is_rejected() {
        let err = expand(parse_quote! {
            fn squares() -> Vec<u8> {
                vec![{
                    #[matrix(n = [1, 2])]
                    n * n
                }]
            }
        })
        .unwrap_err();
        assert!(
            matches!(err, ExpandError::StrayMarker { ref marker, .. } if marker == "matrix"),
            "{err}"
        );

        let err = expand(parse_quote! {
            macro_rules! bind {
                () => {
                    #[scope]
                    const N: [u8; 1] = [1];
                };
            }
        })
        .unwrap_err();
        assert!(matches!(err, ExpandError::StrayMarker { marker, .. } if marker == "scope"));
    }

    #[test]
    fn test_other_attributes_in_macro_bodies_pass() {
        let items = expand(parse_quote! {
            wrap! {
                #[inline]
                #[cfg_attr(test, matrix)]
                fn g() -> bool { 1 != 2 }
            }
        })
        .unwrap();

        assert_eq!(
            render(&items),
            expected(parse_quote! {
                wrap! {
                    #[inline]
                    #[cfg_attr(test, matrix)]
                    fn g() -> bool { 1 != 2 }
                }
            })
        );
    }

    #[test]
    fn test_nested_block_frames_are_released() {
        let err = expand(parse_quote! {
            fn f() {
                {
                    #[scope]
                    let inner = [1];
                }
                #[matrix(x = inner)]
                g(x);
            }
        })
        .unwrap_err();
        assert!(matches!(err, ExpandError::UndefinedMatrix { name, .. } if name == "inner"));
    }
}
