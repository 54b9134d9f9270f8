//! End-to-end expansion tests
//!
//! Covers ordering, scoping, documentation placement, failure modes and
//! identity on unmarked input, driving everything through `Expander`.

mod common;

use common::{expand, expand_with, render, render_file};
use decl_matrix::{EmptyMatrixPolicy, ExpandConfig, ExpandError, Expander};
use pretty_assertions::assert_eq;
use quote::ToTokens;
use syn::parse_quote;

#[test]
fn test_last_named_thread_varies_fastest() {
    let items = expand(parse_quote! {
        #[matrix(a = ['x', 'y'], b = [1, 2, 3])]
        const _: (char, u8) = (a, b);
    })
    .unwrap();

    assert_eq!(
        render(&items),
        render_file(parse_quote! {
            const _: (char, u8) = ('x', 1);
            const _: (char, u8) = ('x', 2);
            const _: (char, u8) = ('x', 3);
            const _: (char, u8) = ('y', 1);
            const _: (char, u8) = ('y', 2);
            const _: (char, u8) = ('y', 3);
        })
    );
}

#[test]
fn test_expansions_splice_in_place() {
    let items = expand(parse_quote! {
        struct Before;

        #[matrix(n = [1, 2])]
        const _: u8 = n;

        struct After;
    })
    .unwrap();

    assert_eq!(
        render(&items),
        render_file(parse_quote! {
            struct Before;
            const _: u8 = 1;
            const _: u8 = 2;
            struct After;
        })
    );
}

#[test]
fn test_inner_binding_shadows_and_outer_is_restored() {
    let items = expand(parse_quote! {
        fn run() {
            #[scope]
            let xs = [1, 2];
            {
                #[scope]
                let xs = [7];

                #[matrix(x = xs)]
                emit(x);
            }
            #[matrix(x = xs)]
            emit(x);
        }
    })
    .unwrap();

    assert_eq!(
        render(&items),
        render_file(parse_quote! {
            fn run() {
                {
                    emit(7);
                }
                emit(1);
                emit(2);
            }
        })
    );
}

#[test]
fn test_three_level_nesting_sees_bindings_at_its_own_level() {
    let items = expand(parse_quote! {
        mod outer {
            #[scope]
            const N: [u8; 1] = [1];

            fn middle() {
                #[scope]
                let n = [20, 21];
                {
                    #[matrix(v = n)]
                    emit(v);

                    #[matrix(v = N)]
                    emit(v);
                }
            }

            #[scope]
            const N: [u8; 1] = [9];

            fn after() {
                #[matrix(v = N)]
                emit(v);
            }
        }
    })
    .unwrap();

    assert_eq!(
        render(&items),
        render_file(parse_quote! {
            mod outer {
                fn middle() {
                    {
                        emit(20);
                        emit(21);
                        emit(1);
                    }
                }

                fn after() {
                    emit(9);
                }
            }
        })
    );
}

#[test]
fn test_nested_block_does_not_see_later_bindings() {
    let err = expand(parse_quote! {
        fn run() {
            {
                #[matrix(v = late)]
                emit(v);
            }
            #[scope]
            let late = [1];
        }
    })
    .unwrap_err();

    assert!(matches!(err, ExpandError::UndefinedMatrix { name, .. } if name == "late"));
}

#[test]
fn test_nested_loops_expand_inner_first() {
    let items = expand(parse_quote! {
        #[matrix(t = [u8, u16])]
        fn check() {
            #[matrix(n = [1, 2])]
            assert_fits::<t>(n);
        }
    })
    .unwrap();

    assert_eq!(
        render(&items),
        render_file(parse_quote! {
            fn check() {
                assert_fits::<u8>(1);
                assert_fits::<u8>(2);
            }
            fn check() {
                assert_fits::<u16>(1);
                assert_fits::<u16>(2);
            }
        })
    );
}

#[test]
fn test_docs_move_to_next_surviving_attribute() {
    let items = expand(parse_quote! {
        /// Returns the lane width.
        #[matrix(w = [4, 8])]
        #[inline]
        fn width() -> usize { w }
    })
    .unwrap();

    assert_eq!(
        render(&items),
        render_file(parse_quote! {
            /// Returns the lane width.
            #[inline]
            fn width() -> usize { 4 }
            /// Returns the lane width.
            #[inline]
            fn width() -> usize { 8 }
        })
    );
}

#[test]
fn test_docs_stay_on_declaration_when_only_markers_were_attached() {
    let items = expand(parse_quote! {
        /// The only one.
        #[matrix(w = [4])]
        fn width() -> usize { w }
    })
    .unwrap();

    assert_eq!(
        render(&items),
        render_file(parse_quote! {
            /// The only one.
            fn width() -> usize { 4 }
        })
    );
}

#[test]
fn test_undefined_reference_fails_whole_expansion() {
    let err = expand(parse_quote! {
        #[matrix(n = [1, 2])]
        const _: u8 = n;

        #[matrix(c = COLORS)]
        const _: &str = c;
    })
    .unwrap_err();

    assert!(matches!(err, ExpandError::UndefinedMatrix { ref name, .. } if name == "COLORS"));
    assert!(err.to_string().contains("COLORS"));
}

#[test]
fn test_empty_matrix_rejected_by_default() {
    let err = expand(parse_quote! {
        #[matrix(n = [])]
        const _: u8 = n;
    })
    .unwrap_err();

    assert!(matches!(err, ExpandError::EmptyMatrix { name, .. } if name == "n"));
}

#[test]
fn test_empty_matrix_allowed_expands_to_nothing() {
    let config = ExpandConfig::default().with_empty_matrix(EmptyMatrixPolicy::Allow);
    let items = expand_with(
        config,
        parse_quote! {
            struct Kept;

            #[scope]
            const NONE: [u8; 0] = [];

            #[matrix(a = [1, 2], n = NONE)]
            const _: u8 = a + n;
        },
    )
    .unwrap();

    assert_eq!(
        render(&items),
        render_file(parse_quote! {
            struct Kept;
        })
    );
}

#[test]
fn test_unmarked_tree_is_unchanged() {
    let file: syn::File = parse_quote! {
        /// A plain module.
        mod plain {
            #[derive(Debug)]
            pub struct Point { x: i32, y: i32 }

            impl Point {
                pub fn norm(&self) -> i32 {
                    let total = self.x * self.x + self.y * self.y;
                    { total }
                }
            }
        }
    };

    let expanded = Expander::default().expand_file(file.clone()).unwrap();
    assert_eq!(expanded, file);
}

#[test]
fn test_compound_fragments_keep_their_grouping() {
    let items = expand(parse_quote! {
        #[matrix(n = [1 + 2])]
        const _: u8 = n * 3;
    })
    .unwrap();

    let syn::Item::Const(item) = &items[0] else {
        panic!("expected a const, got {}", items[0].to_token_stream());
    };
    let syn::Expr::Binary(product) = item.expr.as_ref() else {
        panic!("expected a product");
    };
    assert!(matches!(product.left.as_ref(), syn::Expr::Group(_)));
}

#[test]
fn test_custom_marker_names() {
    let config = ExpandConfig::from_yaml_str("scope_marker: values\nloop_marker: each\n").unwrap();
    let items = expand_with(
        config,
        parse_quote! {
            #[values]
            static NAMES: &[&str] = &["a", "b"];

            #[each(name = NAMES)]
            const _: &str = name;
        },
    )
    .unwrap();

    assert_eq!(
        render(&items),
        render_file(parse_quote! {
            const _: &str = "a";
            const _: &str = "b";
        })
    );
}

#[test]
fn test_stray_marker_is_an_error() {
    let err = expand(parse_quote! {
        fn run(x: u8) -> u8 {
            match x {
                #[matrix(n = [1])]
                _ => 0,
            }
        }
    })
    .unwrap_err();

    assert!(matches!(err, ExpandError::StrayMarker { .. }), "{err}");
}

#[test]
fn test_expand_block() {
    let block: syn::Block = parse_quote!({
        #[scope]
        let (xs, ys) = ([1, 2], [10]);

        #[matrix(x = xs, y = ys)]
        total += x * y;
    });

    let expanded = Expander::default().expand_block(block).unwrap();
    let expected: syn::Block = parse_quote!({
        total += 1 * 10;
        total += 2 * 10;
    });
    assert_eq!(
        expanded.to_token_stream().to_string(),
        expected.to_token_stream().to_string()
    );
}

#[test]
fn test_expand_item_may_yield_many() {
    let item: syn::Item = parse_quote! {
        #[matrix(ty = [u8, u16, u32])]
        impl Marker for ty {}
    };

    let items = Expander::default().expand_item(item).unwrap();
    assert_eq!(
        render(&items),
        render_file(parse_quote! {
            impl Marker for u8 {}
            impl Marker for u16 {}
            impl Marker for u32 {}
        })
    );
}
