use std::collections::HashSet;

use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};
use suds_wsdl::{
    types::{Definition, Part, Service},
    ContractModel, FunctionDescriptor,
};

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "box", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true",
    "try", "type", "unsafe", "use", "where", "while", "yield",
];

pub trait Codegen {
    fn codegen(&self, contract: &ContractModel, wsdl: &str) -> TokenStream;
}

/// `getBankResponse` → `get_bank_response`, `BLZService` → `blz_service`.
/// Keywords get a trailing underscore.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (index, &c) in chars.iter().enumerate() {
        if !c.is_ascii_alphanumeric() {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }

        if c.is_ascii_uppercase() && index > 0 {
            let previous = chars[index - 1];
            let next_lower = chars.get(index + 1).map_or(false, char::is_ascii_lowercase);

            let boundary = previous.is_ascii_lowercase()
                || previous.is_ascii_digit()
                || (previous.is_ascii_uppercase() && next_lower);

            if boundary && !out.ends_with('_') {
                out.push('_');
            }
        }

        out.push(c.to_ascii_lowercase());
    }

    let out = out.trim_end_matches('_').to_owned();

    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", out)
    } else if KEYWORDS.contains(&out.as_str()) {
        format!("{}_", out)
    } else {
        out
    }
}

/// Functions reachable through the SOAP ports of `service`, in binding order.
fn service_functions<'a>(
    definition: &Definition,
    service: &Service,
    contract: &'a ContractModel,
) -> Vec<&'a FunctionDescriptor> {
    let mut seen = HashSet::new();
    let mut functions = Vec::new();

    let bindings = service
        .ports
        .iter()
        .filter_map(|port| definition.find_binding(&port.binding))
        .filter(|binding| binding.version.is_some());

    for binding in bindings {
        for operation in &binding.operations {
            if !seen.insert(operation.name.clone()) {
                continue;
            }

            if let Some(function) = contract.find_function(&operation.name) {
                functions.push(function);
            }
        }
    }

    functions
}

fn unique_idents<'a, I: IntoIterator<Item = &'a str>>(names: I) -> Vec<Ident> {
    let mut seen = HashSet::new();

    names
        .into_iter()
        .map(|name| {
            let base = snake_case(name);
            let mut candidate = base.clone();
            let mut suffix = 2;

            while !seen.insert(candidate.clone()) {
                candidate = format!("{}_{}", base, suffix);
                suffix += 1;
            }

            format_ident!("{}", candidate)
        })
        .collect()
}

impl Codegen for Definition {
    fn codegen(&self, contract: &ContractModel, wsdl: &str) -> TokenStream {
        let services = self
            .services
            .iter()
            .map(|service| service.codegen(contract, wsdl));

        quote! {
            #(#services)*
        }
    }
}

impl Codegen for Service {
    fn codegen(&self, contract: &ContractModel, wsdl: &str) -> TokenStream {
        let definition = match contract.definition() {
            Some(definition) => definition,
            None => return TokenStream::new(),
        };

        let name = format_ident!("{}", snake_case(&self.name));
        let functions = service_functions(definition, self, contract);

        let signatures = functions.iter().map(|function| &function.signature);
        let methods = unique_idents(functions.iter().map(|function| function.name.as_str()))
            .into_iter()
            .zip(&functions)
            .map(|(method, function)| codegen_method(&method, function));

        let service_doc = self
            .documentation
            .as_ref()
            .map(|documentation| quote! { #![doc = #documentation] });

        quote! {
            pub mod #name {
                #service_doc

                pub const WSDL: &str = #wsdl;

                pub const FUNCTIONS: &[&str] = &[#(#signatures),*];

                #[derive(Debug, Clone)]
                pub struct Proxy {
                    client: ::suds::Client,
                }

                impl Proxy {
                    pub fn new() -> Result<Self, ::suds::Error> {
                        Ok(Self::with_client(::suds::Client::new(WSDL)?))
                    }

                    pub fn with_client(client: ::suds::Client) -> Self {
                        Self { client }
                    }

                    pub fn client(&self) -> &::suds::Client {
                        &self.client
                    }

                    #(#methods)*
                }
            }
        }
    }
}

fn codegen_method(method: &Ident, function: &FunctionDescriptor) -> TokenStream {
    let name = &function.name;
    let params = unique_idents(function.input.iter().map(|part: &Part| part.name.as_str()));

    let doc = match &function.documentation {
        Some(documentation) => format!("{}\n\n`{}`", documentation, function.signature),
        None => format!("`{}`", function.signature),
    };

    quote! {
        #[doc = #doc]
        pub async fn #method(&self #(, #params: ::suds::Value)*) -> Result<::suds::Value, ::suds::Error> {
            self.client.call(#name, &[#(#params),*]).await
        }
    }
}
