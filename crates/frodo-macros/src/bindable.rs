//! Expansion of `#[derive(Bindable)]`: a static shape descriptor per
//! request struct, with binding names resolved from serde attributes so
//! binding and serialization can never disagree.

use heck::{
    ToKebabCase, ToLowerCamelCase, ToShoutyKebabCase, ToShoutySnakeCase, ToSnakeCase,
    ToUpperCamelCase,
};
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Token};

pub(crate) fn expand_bindable(input: DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Bindable can only be derived for structs\n\
             \n\
             Hint: scalar newtypes with custom deserializers implement\n\
             the trait by hand with a one-line leaf shape:\n\
             \n\
             impl Bindable for Minutes {\n\
                 fn shape() -> &'static Shape { &Shape::Number }\n\
             }",
        ));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Bindable requires named fields",
        ));
    };

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Bindable cannot be derived for generic structs",
        ));
    }

    let rename_all = container_rename_all(&input.attrs)?;

    let mut descriptors = Vec::new();
    for field in &fields.named {
        let attrs = field_serde_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }

        let declared = field
            .ident
            .as_ref()
            .expect("named field")
            .to_string();
        let binding_name = attrs
            .rename
            .unwrap_or_else(|| apply_rename_all(rename_all.as_deref(), &declared));

        let ty = &field.ty;
        descriptors.push(quote! {
            ::frodo::Field {
                name: #binding_name,
                shape: <#ty as ::frodo::Bindable>::shape,
            }
        });
    }

    Ok(quote! {
        impl ::frodo::Bindable for #name {
            fn shape() -> &'static ::frodo::Shape {
                static SHAPE: ::frodo::Shape = ::frodo::Shape::Struct(&[
                    #(#descriptors),*
                ]);
                &SHAPE
            }
        }
    })
}

#[derive(Default)]
struct FieldSerdeAttrs {
    rename: Option<String>,
    skip: bool,
}

/// Read the serde attributes binding cares about; everything else serde
/// understands is tolerated and skipped over.
fn field_serde_attrs(attrs: &[syn::Attribute]) -> syn::Result<FieldSerdeAttrs> {
    let mut result = FieldSerdeAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                // The split serialize/deserialize form is not supported
                // for binding names; a plain rename covers both.
                if meta.input.peek(Token![=]) {
                    let value: syn::LitStr = meta.value()?.parse()?;
                    result.rename = Some(value.value());
                } else {
                    skip_meta_value(&meta)?;
                }
                Ok(())
            } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_deserializing") {
                result.skip = true;
                Ok(())
            } else {
                skip_meta_value(&meta)
            }
        })?;
    }

    Ok(result)
}

fn container_rename_all(attrs: &[syn::Attribute]) -> syn::Result<Option<String>> {
    let mut rename_all = None;

    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") && meta.input.peek(Token![=]) {
                let value: syn::LitStr = meta.value()?.parse()?;
                rename_all = Some(value.value());
                Ok(())
            } else {
                skip_meta_value(&meta)
            }
        })?;
    }

    Ok(rename_all)
}

/// Consume whatever trails an unrecognized serde key: `= value`, a
/// parenthesized list, or nothing.
fn skip_meta_value(meta: &syn::meta::ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        meta.input.parse::<Token![=]>()?;
        meta.input.parse::<syn::Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        let content;
        syn::parenthesized!(content in meta.input);
        content.parse::<TokenStream2>()?;
    }
    Ok(())
}

fn apply_rename_all(rule: Option<&str>, name: &str) -> String {
    match rule {
        Some("lowercase") => name.to_lowercase(),
        Some("UPPERCASE") => name.to_uppercase(),
        Some("PascalCase") => name.to_upper_camel_case(),
        Some("camelCase") => name.to_lower_camel_case(),
        Some("snake_case") => name.to_snake_case(),
        Some("SCREAMING_SNAKE_CASE") => name.to_shouty_snake_case(),
        Some("kebab-case") => name.to_kebab_case(),
        Some("SCREAMING-KEBAB-CASE") => name.to_shouty_kebab_case(),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_rename_all_rules() {
        assert_eq!(apply_rename_all(Some("PascalCase"), "how_many"), "HowMany");
        assert_eq!(apply_rename_all(Some("camelCase"), "how_many"), "howMany");
        assert_eq!(apply_rename_all(Some("kebab-case"), "how_many"), "how-many");
        assert_eq!(apply_rename_all(None, "how_many"), "how_many");
    }

    #[test]
    fn test_field_attrs_rename_and_skip() {
        let input: DeriveInput = parse_quote! {
            struct Req {
                #[serde(rename = "record_id")]
                id: String,
                #[serde(skip)]
                secret: String,
                #[serde(default, skip_serializing_if = "Option::is_none")]
                note: Option<String>,
            }
        };
        let Data::Struct(data) = &input.data else {
            unreachable!()
        };
        let Fields::Named(fields) = &data.fields else {
            unreachable!()
        };
        let mut iter = fields.named.iter();

        let id = field_serde_attrs(&iter.next().unwrap().attrs).unwrap();
        assert_eq!(id.rename.as_deref(), Some("record_id"));
        assert!(!id.skip);

        let secret = field_serde_attrs(&iter.next().unwrap().attrs).unwrap();
        assert!(secret.skip);

        let note = field_serde_attrs(&iter.next().unwrap().attrs).unwrap();
        assert!(!note.skip);
        assert!(note.rename.is_none());
    }

    #[test]
    fn test_non_struct_rejected() {
        let input: DeriveInput = parse_quote! {
            enum Nope { A, B }
        };
        assert!(expand_bindable(input).is_err());
    }

    #[test]
    fn test_expansion_names_fields() {
        let input: DeriveInput = parse_quote! {
            #[serde(rename_all = "PascalCase", default)]
            struct HighScoreRequest {
                game_id: String,
                how_many: i64,
            }
        };
        let expanded = expand_bindable(input).unwrap().to_string();
        assert!(expanded.contains("\"GameId\""));
        assert!(expanded.contains("\"HowMany\""));
    }
}
