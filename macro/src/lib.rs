extern crate proc_macro;

use std::{env, fs, path::PathBuf};

use proc_macro::TokenStream;
use suds_codegen as codegen;
use syn::{parse_macro_input, LitStr};

/// Expands to the proxy modules of a WSDL file, read relative to the
/// invoking crate's `CARGO_MANIFEST_DIR`.
#[proc_macro]
pub fn suds(input: TokenStream) -> TokenStream {
    let s = parse_macro_input!(input as LitStr);

    let mut path = env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .unwrap_or_default();
    path.push(s.value());

    let expanded = fs::read_to_string(&path)
        .map_err(|err| err.to_string())
        .and_then(|wsdl| codegen::from_wsdl(wsdl).map_err(|err| err.to_string()));

    match expanded {
        Ok(tokens) => tokens.into(),
        Err(message) => syn::Error::new(s.span(), format!("{}: {}", path.display(), message))
            .to_compile_error()
            .into(),
    }
}
