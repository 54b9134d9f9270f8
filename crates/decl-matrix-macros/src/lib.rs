//! Procedural macros for decl-matrix
//!
//! This crate provides two macros:
//! - `#[expand(..)]` - Expand `#[scope]` / `#[matrix(..)]` markers inside one item
//! - `expand_items! { .. }` - Expand markers across a sequence of items
//!
//! Both start from `ExpandConfig::from_env()`, so a `DECL_MATRIX_CONFIG` file
//! applies to every invocation in the build.

use proc_macro::TokenStream;

mod entry;

/// Expand the annotated item as a one-member block.
///
/// The item may itself carry loop markers (placed after `#[expand]`), and any
/// nested block, module, impl or trait inside it is expanded too.
///
/// # Arguments
///
/// - `scope_marker = "..."` - Rename the scope marker (default `scope`)
/// - `loop_marker = "..."` - Rename the loop marker (default `matrix`)
/// - `allow_empty` - An empty matrix deletes the declaration instead of failing
///
/// # Example
///
/// ```ignore
/// #[expand]
/// fn squares() -> Vec<u32> {
///     let mut out = Vec::new();
///     #[scope]
///     let sides = [1, 2, 3];
///     #[matrix(n = sides)]
///     out.push(n * n);
///     out
/// }
/// ```
#[proc_macro_attribute]
pub fn expand(attr: TokenStream, input: TokenStream) -> TokenStream {
    entry::expand_attribute_impl(attr, input)
}

/// Expand a sequence of items as one top-level block.
///
/// A `#[scope]` item binds for the items after it.
///
/// # Example
///
/// ```ignore
/// expand_items! {
///     #[matrix(ty = [u8, u16, u32])]
///     impl Bits for ty {
///         const BITS: usize = 8 * std::mem::size_of::<ty>();
///     }
/// }
/// ```
#[proc_macro]
pub fn expand_items(input: TokenStream) -> TokenStream {
    entry::expand_items_impl(input)
}
