//! Compile-time Cartesian expansion of Rust declarations
//!
//! Two cooperating attributes drive the expansion:
//! - `#[scope]` on a `const`, `static` or `let` initialized with an array
//!   literal binds a named matrix for the declarations that follow it in the
//!   same block.
//! - `#[matrix(name = [..], other = SCOPED)]` instantiates the declaration it
//!   sits on once per combination of the named lists, substituting each name
//!   with the picked expression.
//!
//! # Example
//!
//! ```
//! use decl_matrix::Expander;
//!
//! let file: syn::File = syn::parse_quote! {
//!     #[scope]
//!     const WIDTHS: [u32; 2] = [8, 16];
//!
//!     #[matrix(w = WIDTHS, signed = [false, true])]
//!     const _: (u32, bool) = (w, signed);
//! };
//!
//! let expanded = Expander::default().expand_file(file).unwrap();
//! assert_eq!(expanded.items.len(), 4);
//! ```
//!
//! The proc-macro front end lives in the `decl-matrix-macros` crate.

pub mod attrs;
pub mod config;
pub mod decl;
pub mod descriptor;
pub mod driver;
pub mod error;
pub mod expand;
pub mod instantiate;
pub mod matrix;
pub mod scope;

pub use attrs::{extract_attrs, Extracted};
pub use config::{ConfigError, EmptyMatrixPolicy, ExpandConfig, CONFIG_ENV_VAR};
pub use decl::Declaration;
pub use descriptor::{combination_count, LoopDescriptor, LoopThread};
pub use error::{ExpandError, Result};
pub use expand::{combinations, expand_template};
pub use instantiate::{instantiate, SubstitutionMap};
pub use matrix::ExprMatrix;
pub use scope::{BlockScope, ScopeFrame, ScopeStack};

use syn::{Block, File, Item};

/// Entry point: expands every marker in a tree under one configuration.
///
/// Each call starts from an empty scope stack; nothing is carried between
/// calls.
#[derive(Debug, Clone, Default)]
pub struct Expander {
    config: ExpandConfig,
}

impl Expander {
    pub fn new(config: ExpandConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExpandConfig {
        &self.config
    }

    /// Expand a whole source file. The file's items form the outermost block.
    pub fn expand_file(&self, mut file: File) -> Result<File> {
        file.items = self.expand_items(std::mem::take(&mut file.items))?;
        Ok(file)
    }

    pub fn expand_items(&self, items: Vec<Item>) -> Result<Vec<Item>> {
        driver::expand_members(items, &self.config)
    }

    /// Expand a single item as a one-member block. A loop-marked item may
    /// expand to several items, or to none.
    pub fn expand_item(&self, item: Item) -> Result<Vec<Item>> {
        self.expand_items(vec![item])
    }

    pub fn expand_block(&self, mut block: Block) -> Result<Block> {
        block.stmts = driver::expand_members(std::mem::take(&mut block.stmts), &self.config)?;
        Ok(block)
    }
}
