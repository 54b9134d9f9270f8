//! Implementation of `#[expand]` and `expand_items!`

use decl_matrix::{EmptyMatrixPolicy, ExpandConfig, Expander};
use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::meta::ParseNestedMeta;
use syn::parse::{Parse, ParseStream};
use syn::{parse_macro_input, Item, LitStr};

pub fn expand_attribute_impl(attr: TokenStream, input: TokenStream) -> TokenStream {
    let mut args = EntryArgs::default();
    let parser = syn::meta::parser(|meta| args.parse(meta));
    parse_macro_input!(attr with parser);
    let item = parse_macro_input!(input as Item);

    let config = match args.into_config() {
        Ok(config) => config,
        Err(err) => return err.to_compile_error().into(),
    };

    match Expander::new(config).expand_item(item) {
        Ok(items) => quote!(#(#items)*).into(),
        Err(err) => syn::Error::from(err).to_compile_error().into(),
    }
}

pub fn expand_items_impl(input: TokenStream) -> TokenStream {
    let Items(items) = parse_macro_input!(input as Items);

    let config = match EntryArgs::default().into_config() {
        Ok(config) => config,
        Err(err) => return err.to_compile_error().into(),
    };

    match Expander::new(config).expand_items(items) {
        Ok(items) => quote!(#(#items)*).into(),
        Err(err) => syn::Error::from(err).to_compile_error().into(),
    }
}

struct Items(Vec<Item>);

impl Parse for Items {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut items = Vec::new();
        while !input.is_empty() {
            items.push(input.parse()?);
        }
        Ok(Items(items))
    }
}

/// `#[expand(scope_marker = "..", loop_marker = "..", allow_empty)]`
#[derive(Default)]
struct EntryArgs {
    scope_marker: Option<LitStr>,
    loop_marker: Option<LitStr>,
    allow_empty: bool,
}

impl EntryArgs {
    fn parse(&mut self, meta: ParseNestedMeta) -> syn::Result<()> {
        if meta.path.is_ident("scope_marker") {
            self.scope_marker = Some(meta.value()?.parse()?);
            Ok(())
        } else if meta.path.is_ident("loop_marker") {
            self.loop_marker = Some(meta.value()?.parse()?);
            Ok(())
        } else if meta.path.is_ident("allow_empty") {
            self.allow_empty = true;
            Ok(())
        } else {
            Err(meta.error(
                "unsupported expand argument, expected `scope_marker`, `loop_marker` or `allow_empty`",
            ))
        }
    }

    /// Environment config with the explicit arguments layered on top.
    fn into_config(self) -> syn::Result<ExpandConfig> {
        let mut config = ExpandConfig::from_env()
            .map_err(|err| syn::Error::new(Span::call_site(), format!("{err:#}")))?;

        // Validation errors point at a marker argument when one was given.
        let mut span = Span::call_site();
        if let Some(name) = &self.loop_marker {
            config = config.with_loop_marker(name.value());
            span = name.span();
        }
        if let Some(name) = &self.scope_marker {
            config = config.with_scope_marker(name.value());
            span = name.span();
        }
        if self.allow_empty {
            config = config.with_empty_matrix(EmptyMatrixPolicy::Allow);
        }

        config
            .validate()
            .map_err(|err| syn::Error::new(span, err.to_string()))?;
        Ok(config)
    }
}
