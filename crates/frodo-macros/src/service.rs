//! Expansion of the `#[service]` attribute: the async-trait contract,
//! the gateway constructor, and the remote client.

use heck::ToSnakeCase;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::ItemTrait;

use frodo_parse::{OperationInfo, ServiceInfo, parse_service};

pub(crate) fn expand_service(item: ItemTrait) -> syn::Result<TokenStream2> {
    let service = parse_service(&item)?;
    let vis = item.vis.clone();
    let contract = emit_contract(item);
    let gateway = emit_gateway(&vis, &service);
    let client = emit_client(&vis, &service);

    Ok(quote! {
        #contract

        #gateway

        #client
    })
}

/// Re-emit the trait under `#[async_trait]`, adding the `Send + Sync`
/// supertraits trait objects need if the author left them off.
fn emit_contract(mut item: ItemTrait) -> TokenStream2 {
    fn has(supertraits: &syn::punctuated::Punctuated<syn::TypeParamBound, syn::Token![+]>, name: &str) -> bool {
        supertraits.iter().any(|bound| match bound {
            syn::TypeParamBound::Trait(t) => t.path.is_ident(name),
            _ => false,
        })
    }
    if !has(&item.supertraits, "Send") {
        item.supertraits.push(syn::parse_quote!(Send));
    }
    if !has(&item.supertraits, "Sync") {
        item.supertraits.push(syn::parse_quote!(Sync));
    }
    if !item.supertraits.is_empty() {
        item.colon_token.get_or_insert_with(Default::default);
    }

    quote! {
        #[::frodo::async_trait]
        #item
    }
}

fn emit_gateway(vis: &syn::Visibility, service: &ServiceInfo) -> TokenStream2 {
    let trait_ident = &service.ident;
    let service_name = &service.name;
    let fn_ident = format_ident!("new_{}_gateway", service.name.to_snake_case());
    let fn_docs = format!(
        "Build the HTTP gateway for a [`{trait_ident}`] implementation."
    );

    let endpoints: Vec<TokenStream2> = service
        .operations
        .iter()
        .map(|op| emit_endpoint(service_name, trait_ident, op))
        .collect();

    let version = service.version.as_ref().map(|v| {
        quote! { gateway.set_version(#v); }
    });

    quote! {
        #[doc = #fn_docs]
        #vis fn #fn_ident(
            service: ::std::sync::Arc<dyn #trait_ident>,
        ) -> ::frodo::Gateway {
            let mut gateway = ::frodo::Gateway::new(#service_name);
            #version
            #(#endpoints)*
            gateway
        }
    }
}

fn emit_endpoint(
    service_name: &str,
    trait_ident: &syn::Ident,
    op: &OperationInfo,
) -> TokenStream2 {
    let op_ident = &op.ident;
    let op_name = &op.name;
    let method = format_ident!("{}", op.method);
    let path = &op.path;
    let status = op.status;
    let request_ty = &op.request_ty;

    let respond_ok = if op.raw_response {
        quote! { ::frodo::respond::stream(status, value) }
    } else {
        quote! { ::frodo::respond::json(status, &value) }
    };

    quote! {
        {
            let service = ::std::sync::Arc::clone(&service);
            gateway.register(
                ::frodo::Endpoint::new(
                    ::frodo::http::Method::#method,
                    #path,
                    move |req: ::frodo::Request| {
                        let service = ::std::sync::Arc::clone(&service);
                        async move {
                            let status = ::frodo::http::StatusCode::from_u16(#status)
                                .unwrap_or(::frodo::http::StatusCode::OK);
                            let ctx = ::frodo::Context::from_request(&req);
                            let mut shape = <#request_ty as ::std::default::Default>::default();
                            if let ::std::result::Result::Err(err) =
                                ::frodo::binder::bind(&req, &mut shape)
                            {
                                return ::frodo::respond::error(&::frodo::Error::from(err));
                            }
                            match #trait_ident::#op_ident(&*service, &ctx, shape).await {
                                ::std::result::Result::Ok(value) => #respond_ok,
                                ::std::result::Result::Err(err) => ::frodo::respond::error(&err),
                            }
                        }
                    },
                )
                .service(#service_name)
                .operation(#op_name)
                .status(#status),
            );
        }
    }
}

fn emit_client(vis: &syn::Visibility, service: &ServiceInfo) -> TokenStream2 {
    let trait_ident = &service.ident;
    let client_ident = format_ident!("{}Client", service.name);
    let struct_docs = format!(
        "Remote [`{trait_ident}`]: every operation invokes the \
         corresponding gateway endpoint over HTTP."
    );
    let new_docs = format!(
        "Connect to a remote [`{trait_ident}`] gateway at the given base URL."
    );

    let operations: Vec<TokenStream2> = service
        .operations
        .iter()
        .map(|op| {
            let op_ident = &op.ident;
            let method = format_ident!("{}", op.method);
            let path = &op.path;
            let request_ty = &op.request_ty;
            let response_ty = &op.response_ty;
            let invoke = if op.raw_response {
                format_ident!("invoke_raw")
            } else {
                format_ident!("invoke")
            };

            quote! {
                async fn #op_ident(
                    &self,
                    ctx: &::frodo::Context,
                    req: #request_ty,
                ) -> ::std::result::Result<#response_ty, ::frodo::Error> {
                    self.client
                        .#invoke(ctx, ::frodo::http::Method::#method, #path, &req)
                        .await
                }
            }
        })
        .collect();

    quote! {
        #[doc = #struct_docs]
        #[derive(Clone)]
        #vis struct #client_ident {
            client: ::frodo::client::Client,
        }

        impl #client_ident {
            #[doc = #new_docs]
            #vis fn new(
                base_url: impl ::std::convert::Into<::std::string::String>,
            ) -> ::std::result::Result<Self, ::frodo::Error> {
                ::std::result::Result::Ok(Self {
                    client: ::frodo::client::Client::new(base_url)?,
                })
            }

            /// Wrap an already configured caller (custom timeout or a
            /// shared connection pool).
            pub fn with_client(client: ::frodo::client::Client) -> Self {
                Self { client }
            }
        }

        #[::frodo::async_trait]
        impl #trait_ident for #client_ident {
            #(#operations)*
        }
    }
}
