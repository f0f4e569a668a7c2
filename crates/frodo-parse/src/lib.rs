//! Shared parsing utilities for frodo proc macros.
//!
//! This crate turns an annotated service trait into the data model the
//! emitters consume: operations with their routes, statuses, and
//! request/response types, resolved from doc-comment options and
//! naming defaults.

use heck::ToUpperCamelCase;
use proc_macro2::Span;
use syn::{
    FnArg, Ident, ItemTrait, Lit, Meta, ReturnType, TraitItem, TraitItemFn, Type,
    spanned::Spanned,
};

/// Parsed information about a service trait.
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    /// The trait identifier, e.g. `CalculatorService`.
    pub ident: Ident,
    /// The service name as it appears in routes.
    pub name: String,
    /// Normalized path prefix (`""` when none was declared).
    pub prefix: String,
    /// Free-form `VERSION` option, if declared.
    pub version: Option<String>,
    /// Documentation with option lines removed.
    pub docs: Option<String>,
    pub operations: Vec<OperationInfo>,
}

/// Parsed information about one operation.
#[derive(Debug, Clone)]
pub struct OperationInfo {
    /// The method identifier, e.g. `high_scores_for_game`.
    pub ident: Ident,
    /// The operation name as it appears in routes: PascalCase of the
    /// method name, e.g. `HighScoresForGame`.
    pub name: String,
    pub docs: Option<String>,
    /// Uppercase HTTP method.
    pub method: String,
    /// Full route path, prefix included.
    pub path: String,
    /// Success status.
    pub status: u16,
    pub request_ty: Type,
    pub response_ty: Type,
    /// Whether the response is the raw content-stream shape rather
    /// than a JSON value.
    pub raw_response: bool,
}

/// Doc-comment options of the form `<KEY> <VALUE>`, one per line, any
/// order, any leading whitespace.
#[derive(Debug, Clone, Default)]
pub struct DocOptions {
    pub method: Option<String>,
    pub path: Option<String>,
    pub status: Option<u16>,
    pub prefix: Option<String>,
    pub version: Option<String>,
    /// Doc lines that were not options.
    pub docs: Option<String>,
}

const METHOD_KEYS: [&str; 6] = ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD"];

impl DocOptions {
    /// Scan a doc comment for recognized `<KEY> <VALUE>` lines.
    pub fn parse(docs: Option<&str>, span: Span) -> syn::Result<Self> {
        let mut options = Self::default();
        let mut remaining = Vec::new();

        for line in docs.unwrap_or_default().lines() {
            let trimmed = line.trim();
            let Some((key, value)) = trimmed.split_once(char::is_whitespace) else {
                remaining.push(line);
                continue;
            };
            let value = value.trim();

            if METHOD_KEYS.contains(&key) {
                options.method = Some(key.to_string());
                options.path = Some(normalize_path(value));
            } else if key == "HTTP" {
                let status: u16 = value.parse().map_err(|_| {
                    syn::Error::new(
                        span,
                        format!(
                            "invalid HTTP option `{value}`\n\
                             \n\
                             The value must be a status code, e.g.:\n\
                             /// HTTP 202"
                        ),
                    )
                })?;
                options.status = Some(status);
            } else if key == "PREFIX" || key == "PATH" {
                options.prefix = Some(normalize_path(value));
            } else if key == "VERSION" {
                options.version = Some(value.to_string());
            } else {
                remaining.push(line);
            }
        }

        let docs = remaining.join("\n");
        let docs = docs.trim();
        options.docs = (!docs.is_empty()).then(|| docs.to_string());
        Ok(options)
    }
}

/// Normalize a route path: exactly one leading slash, no trailing
/// slashes.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_start_matches('/').trim_end_matches('/');
    format!("/{trimmed}")
}

/// Prepend a prefix exactly once. Both sides are assumed normalized.
pub fn join_prefix(prefix: &str, path: &str) -> String {
    if prefix.is_empty() || prefix == "/" {
        path.to_string()
    } else {
        format!("{prefix}{path}")
    }
}

/// Extract doc comments from attributes.
pub fn extract_docs(attrs: &[syn::Attribute]) -> Option<String> {
    let docs: Vec<String> = attrs
        .iter()
        .filter_map(|attr| {
            if attr.path().is_ident("doc")
                && let Meta::NameValue(meta) = &attr.meta
                && let syn::Expr::Lit(syn::ExprLit {
                    lit: Lit::Str(s), ..
                }) = &meta.value
            {
                return Some(s.value().trim().to_string());
            }
            None
        })
        .collect();

    if docs.is_empty() {
        None
    } else {
        Some(docs.join("\n"))
    }
}

/// Parse an annotated service trait into the emitter data model.
pub fn parse_service(item: &ItemTrait) -> syn::Result<ServiceInfo> {
    let ident = item.ident.clone();
    let name = ident.to_string();

    if !name.ends_with("Service") {
        return Err(syn::Error::new_spanned(
            &item.ident,
            format!(
                "service trait names must end in `Service`, got `{name}`\n\
                 \n\
                 Hint: rename the trait, e.g. `{name}Service`"
            ),
        ));
    }

    if !item.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "service traits cannot be generic",
        ));
    }

    let trait_options = DocOptions::parse(extract_docs(&item.attrs).as_deref(), item.ident.span())?;
    let prefix = trait_options.prefix.unwrap_or_default();

    let mut operations = Vec::new();
    for trait_item in &item.items {
        if let TraitItem::Fn(method) = trait_item {
            operations.push(parse_operation(&name, &prefix, method)?);
        }
    }

    Ok(ServiceInfo {
        ident,
        name,
        prefix,
        version: trait_options.version,
        docs: trait_options.docs,
        operations,
    })
}

fn parse_operation(
    service: &str,
    prefix: &str,
    method: &TraitItemFn,
) -> syn::Result<OperationInfo> {
    let ident = method.sig.ident.clone();
    let name = ident.to_string().to_upper_camel_case();

    if method.sig.asyncness.is_none() {
        return Err(syn::Error::new_spanned(
            &method.sig,
            "service operations must be async",
        ));
    }

    let options = DocOptions::parse(extract_docs(&method.attrs).as_deref(), method.sig.span())?;

    let (request_ty, _) = parse_inputs(method)?;
    let response_ty = parse_output(method)?;
    let raw_response = type_is(&response_ty, "RawResponse");

    // No route option means the RPC-style default: POST /Service.Op.
    // An explicitly declared POST creates something, so it defaults to
    // 201; HTTP always has the last word.
    let (http_method, path) = match (&options.method, &options.path) {
        (Some(m), Some(p)) => (m.clone(), p.clone()),
        _ => ("POST".to_string(), format!("/{service}.{name}")),
    };
    let status = options.status.unwrap_or(match options.method.as_deref() {
        Some("POST") => 201,
        _ => 200,
    });

    Ok(OperationInfo {
        ident,
        name,
        docs: options.docs,
        method: http_method,
        path: join_prefix(prefix, &path),
        status,
        request_ty,
        response_ty,
        raw_response,
    })
}

/// Validate the `(&self, ctx: &Context, req: Shape)` input shape and
/// return the request type plus the context parameter name.
fn parse_inputs(method: &TraitItemFn) -> syn::Result<(Type, Ident)> {
    let mut inputs = method.sig.inputs.iter();

    match inputs.next() {
        Some(FnArg::Receiver(receiver)) if receiver.reference.is_some() => {}
        _ => {
            return Err(syn::Error::new_spanned(
                &method.sig,
                "service operations take `&self`",
            ));
        }
    }

    let signature_hint = "service operations have the shape\n\
                          \n\
                          async fn op(&self, ctx: &Context, req: OpRequest) -> Result<OpResponse, Error>;";

    let ctx_name = match inputs.next() {
        Some(FnArg::Typed(pat)) => {
            let is_context_ref = matches!(
                pat.ty.as_ref(),
                Type::Reference(reference) if type_is(&reference.elem, "Context")
            );
            if !is_context_ref {
                return Err(syn::Error::new_spanned(
                    pat,
                    format!("the first operation parameter is `ctx: &Context`\n\n{signature_hint}"),
                ));
            }
            pat_ident(pat)?
        }
        _ => {
            return Err(syn::Error::new_spanned(
                &method.sig,
                format!("missing context parameter\n\n{signature_hint}"),
            ));
        }
    };

    let request_ty = match inputs.next() {
        Some(FnArg::Typed(pat)) => {
            let ty = pat.ty.as_ref().clone();
            require_composite(&ty, "request")?;
            ty
        }
        _ => {
            return Err(syn::Error::new_spanned(
                &method.sig,
                format!("missing request parameter\n\n{signature_hint}"),
            ));
        }
    };

    if let Some(extra) = inputs.next() {
        return Err(syn::Error::new_spanned(
            extra,
            format!("unexpected extra parameter\n\n{signature_hint}"),
        ));
    }

    Ok((request_ty, ctx_name))
}

/// Validate the `Result<Response, Error>` output shape and return the
/// response type.
fn parse_output(method: &TraitItemFn) -> syn::Result<Type> {
    let err = || {
        syn::Error::new_spanned(
            &method.sig.output,
            "service operations return `Result<OpResponse, Error>`",
        )
    };

    let ReturnType::Type(_, ty) = &method.sig.output else {
        return Err(err());
    };

    let Type::Path(type_path) = ty.as_ref() else {
        return Err(err());
    };
    let segment = type_path.path.segments.last().ok_or_else(err)?;
    if segment.ident != "Result" {
        return Err(err());
    }
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return Err(err());
    };
    let Some(syn::GenericArgument::Type(response_ty)) = args.args.first() else {
        return Err(err());
    };

    require_composite(response_ty, "response")?;
    Ok(response_ty.clone())
}

fn pat_ident(pat: &syn::PatType) -> syn::Result<Ident> {
    match pat.pat.as_ref() {
        syn::Pat::Ident(ident) => Ok(ident.ident.clone()),
        other => Err(syn::Error::new_spanned(
            other,
            "unsupported parameter pattern\n\
             \n\
             Use a simple name: `ctx: &Context`, `req: OpRequest`",
        )),
    }
}

/// Whether a type's last path segment is the given identifier.
pub fn type_is(ty: &Type, name: &str) -> bool {
    matches!(
        ty,
        Type::Path(path) if path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == name)
    )
}

const PRIMITIVES: [&str; 18] = [
    "String", "str", "bool", "char", "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16",
    "u32", "u64", "u128", "usize", "f32", "f64",
];

/// Request and response shapes must be composite values, not scalars,
/// references, or unit.
fn require_composite(ty: &Type, role: &str) -> syn::Result<()> {
    let composite = match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .is_some_and(|segment| !PRIMITIVES.contains(&segment.ident.to_string().as_str())),
        _ => false,
    };

    if composite {
        Ok(())
    } else {
        Err(syn::Error::new_spanned(
            ty,
            format!(
                "{role} types must be composite shapes\n\
                 \n\
                 Declare a struct for the {role} value, even when it has a\n\
                 single field; scalars, references, and unit do not carry\n\
                 binding names."
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_doc_options_any_order_any_indent() {
        let docs = "Returns the top scores.\n\
                    \u{20}  GET /game/:GameID/highscore\n\
                    HTTP 202\n\
                    VERSION 2.1 beta\n\
                    More prose.";
        let options = DocOptions::parse(Some(docs), Span::call_site()).unwrap();

        assert_eq!(options.method.as_deref(), Some("GET"));
        assert_eq!(options.path.as_deref(), Some("/game/:GameID/highscore"));
        assert_eq!(options.status, Some(202));
        assert_eq!(options.version.as_deref(), Some("2.1 beta"));
        assert_eq!(
            options.docs.as_deref(),
            Some("Returns the top scores.\nMore prose.")
        );
    }

    #[test]
    fn test_doc_options_path_normalization() {
        let options =
            DocOptions::parse(Some("GET game/:id/"), Span::call_site()).unwrap();
        assert_eq!(options.path.as_deref(), Some("/game/:id"));

        let options =
            DocOptions::parse(Some("PREFIX //v2/"), Span::call_site()).unwrap();
        assert_eq!(options.prefix.as_deref(), Some("/v2"));
    }

    #[test]
    fn test_doc_options_invalid_status_is_error() {
        assert!(DocOptions::parse(Some("HTTP twelve"), Span::call_site()).is_err());
    }

    #[test]
    fn test_parse_service_defaults() {
        let item: ItemTrait = parse_quote! {
            /// Basic arithmetic.
            pub trait CalculatorService: Send + Sync {
                /// Add two numbers.
                async fn add(&self, ctx: &Context, req: AddRequest) -> Result<AddResponse, Error>;
            }
        };
        let service = parse_service(&item).unwrap();

        assert_eq!(service.name, "CalculatorService");
        assert_eq!(service.prefix, "");
        let op = &service.operations[0];
        assert_eq!(op.name, "Add");
        assert_eq!(op.method, "POST");
        assert_eq!(op.path, "/CalculatorService.Add");
        assert_eq!(op.status, 200);
        assert_eq!(op.docs.as_deref(), Some("Add two numbers."));
    }

    #[test]
    fn test_parse_service_prefix_and_overrides() {
        let item: ItemTrait = parse_quote! {
            /// PREFIX /v2
            pub trait ScoreService: Send + Sync {
                /// GET /game/:GameID/highscore
                async fn high_scores_for_game(
                    &self,
                    ctx: &Context,
                    req: HighScoreRequest,
                ) -> Result<HighScoreResponse, Error>;

                /// POST /game/:GameID/highscore
                /// HTTP 202
                async fn record_high_score(
                    &self,
                    ctx: &Context,
                    req: RecordRequest,
                ) -> Result<RecordResponse, Error>;
            }
        };
        let service = parse_service(&item).unwrap();

        assert_eq!(service.prefix, "/v2");
        let get = &service.operations[0];
        assert_eq!(get.method, "GET");
        assert_eq!(get.path, "/v2/game/:GameID/highscore");
        assert_eq!(get.status, 200);
        assert_eq!(get.name, "HighScoresForGame");

        let post = &service.operations[1];
        assert_eq!(post.method, "POST");
        assert_eq!(post.status, 202);
    }

    #[test]
    fn test_explicit_post_defaults_to_201() {
        let item: ItemTrait = parse_quote! {
            pub trait ThingService: Send + Sync {
                /// POST /things
                async fn create_thing(&self, ctx: &Context, req: CreateRequest) -> Result<CreateResponse, Error>;
            }
        };
        let service = parse_service(&item).unwrap();
        assert_eq!(service.operations[0].status, 201);
    }

    #[test]
    fn test_raw_response_detection() {
        let item: ItemTrait = parse_quote! {
            pub trait FileService: Send + Sync {
                /// GET /export
                async fn export(&self, ctx: &Context, req: ExportRequest) -> Result<RawResponse, Error>;
            }
        };
        let service = parse_service(&item).unwrap();
        assert!(service.operations[0].raw_response);
    }

    #[test]
    fn test_trait_name_must_end_in_service() {
        let item: ItemTrait = parse_quote! {
            pub trait Calculator: Send + Sync {}
        };
        assert!(parse_service(&item).is_err());
    }

    #[test]
    fn test_primitive_request_rejected() {
        let item: ItemTrait = parse_quote! {
            pub trait MathService: Send + Sync {
                async fn add(&self, ctx: &Context, req: i64) -> Result<AddResponse, Error>;
            }
        };
        assert!(parse_service(&item).is_err());
    }

    #[test]
    fn test_missing_request_rejected() {
        let item: ItemTrait = parse_quote! {
            pub trait MathService: Send + Sync {
                async fn add(&self, ctx: &Context) -> Result<AddResponse, Error>;
            }
        };
        assert!(parse_service(&item).is_err());
    }

    #[test]
    fn test_non_result_output_rejected() {
        let item: ItemTrait = parse_quote! {
            pub trait MathService: Send + Sync {
                async fn add(&self, ctx: &Context, req: AddRequest) -> AddResponse;
            }
        };
        assert!(parse_service(&item).is_err());
    }

    #[test]
    fn test_sync_operation_rejected() {
        let item: ItemTrait = parse_quote! {
            pub trait MathService: Send + Sync {
                fn add(&self, ctx: &Context, req: AddRequest) -> Result<AddResponse, Error>;
            }
        };
        assert!(parse_service(&item).is_err());
    }
}
