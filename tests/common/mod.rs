//! Shared helpers for the integration tests.
#![allow(dead_code)]

use decl_matrix::{ExpandConfig, Expander, Result};
use quote::ToTokens;
use syn::{File, Item};
use tracing_subscriber::EnvFilter;

/// Route `tracing` output through the test harness. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("decl_matrix=debug")),
        )
        .with_test_writer()
        .try_init();
}

pub fn expand(file: File) -> Result<Vec<Item>> {
    expand_with(ExpandConfig::default(), file)
}

pub fn expand_with(config: ExpandConfig, file: File) -> Result<Vec<Item>> {
    init_tracing();
    Ok(Expander::new(config).expand_file(file)?.items)
}

/// One item per line, so diffs point at the instance that differs.
pub fn render(items: &[Item]) -> String {
    items
        .iter()
        .map(|item| item.to_token_stream().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_file(file: File) -> String {
    render(&file.items)
}
