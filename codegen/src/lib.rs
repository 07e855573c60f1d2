use proc_macro2::TokenStream;
use suds_wsdl::{error, ContractModel, ContractOptions};

use codegen::Codegen;

mod codegen;

pub use codegen::snake_case;

/// Generates one module per WSDL service, each holding a `FUNCTIONS` table
/// and a `Proxy` with an async method per function.
pub fn from_wsdl<S: AsRef<str>>(wsdl: S) -> Result<TokenStream, error::Error> {
    let wsdl = wsdl.as_ref();
    let contract = ContractModel::from_wsdl(wsdl, ContractOptions::new())?;
    from_contract(&contract, wsdl)
}

pub fn from_contract(contract: &ContractModel, wsdl: &str) -> Result<TokenStream, error::Error> {
    match contract.definition() {
        Some(definition) => Ok(definition.codegen(contract, wsdl)),
        None => Err(error::Error::MissingDefinitions),
    }
}

#[cfg(test)]
mod tests {
    use syn::{ImplItem, Item};

    use super::*;

    const BLZ: &str = include_str!("../../tests/fixtures/blz.wsdl");
    const INVENTORY: &str = include_str!("../../tests/fixtures/inventory.wsdl");

    fn module_items(file: &syn::File, name: &str) -> Vec<Item> {
        file.items
            .iter()
            .find_map(|item| match item {
                Item::Mod(module) if module.ident == name => {
                    module.content.as_ref().map(|(_, items)| items.clone())
                }
                _ => None,
            })
            .unwrap()
    }

    fn proxy_methods(items: &[Item]) -> Vec<String> {
        items
            .iter()
            .filter_map(|item| match item {
                Item::Impl(block) => Some(block.items.iter()),
                _ => None,
            })
            .flatten()
            .filter_map(|item| match item {
                ImplItem::Method(method) => Some(method.sig.ident.to_string()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn generates_service_module() {
        let file: syn::File = syn::parse2(from_wsdl(BLZ).unwrap()).unwrap();
        let items = module_items(&file, "blz_service");

        assert_eq!(
            proxy_methods(&items),
            ["new", "with_client", "client", "get_bank"]
        );

        let functions = items.iter().find_map(|item| match item {
            Item::Const(constant) if constant.ident == "FUNCTIONS" => Some(constant),
            _ => None,
        });
        let functions = quote::ToTokens::to_token_stream(&functions.unwrap().expr).to_string();
        assert!(functions.contains("getBankResponseType getBank(getBankType $parameters)"));
    }

    #[test]
    fn methods_take_one_value_per_part() {
        let file: syn::File = syn::parse2(from_wsdl(INVENTORY).unwrap()).unwrap();
        let items = module_items(&file, "inventory_service");

        assert_eq!(
            proxy_methods(&items),
            ["new", "with_client", "client", "add_item", "list_tags", "ping", "search"]
        );

        let add_item = items
            .iter()
            .filter_map(|item| match item {
                Item::Impl(block) => Some(block.items.iter()),
                _ => None,
            })
            .flatten()
            .find_map(|item| match item {
                ImplItem::Method(method) if method.sig.ident == "add_item" => Some(method),
                _ => None,
            })
            .unwrap();

        assert!(add_item.sig.asyncness.is_some());
        assert_eq!(add_item.sig.inputs.len(), 3);
    }

    #[test]
    fn rejects_invalid_wsdl() {
        assert!(from_wsdl("invalid").is_err());
    }
}
