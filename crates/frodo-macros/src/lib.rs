//! Proc macros for frodo.
//!
//! `#[service]` reads a service trait and emits the HTTP artifacts;
//! `#[derive(Bindable)]` emits the shape descriptor the request binder
//! walks at runtime. Everything these macros generate delegates to
//! `frodo-core`; no behavior lives in generated code.

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemTrait, parse_macro_input};

mod bindable;
mod service;

/// Turn a service trait into a remotable service.
///
/// The trait name must end in `Service` and every operation has the
/// shape `async fn op(&self, ctx: &Context, req: OpRequest) ->
/// Result<OpResponse, Error>`. Routing comes from doc-comment options:
///
/// ```ignore
/// use frodo::{service, Context, Error};
///
/// /// PREFIX /v2
/// #[service]
/// pub trait ScoreService {
///     /// Fetch the top N scores for one game.
///     /// GET /game/:GameID/highscore
///     async fn high_scores_for_game(
///         &self,
///         ctx: &Context,
///         req: HighScoreRequest,
///     ) -> Result<HighScoreResponse, Error>;
/// }
/// ```
///
/// Recognized options, one per doc line, in any order:
///
/// | Option | Meaning |
/// |--------|---------|
/// | `GET/POST/PUT/PATCH/DELETE/HEAD <path>` | Route override (`:name` captures path segments) |
/// | `HTTP <status>` | Success status override |
/// | `PREFIX <path>` (trait level) | Prepended to every route |
/// | `VERSION <text>` | Free-form version string |
///
/// Without a route option an operation is RPC-style:
/// `POST /<Service>.<Op>` responding 200.
///
/// # Generated items
///
/// - the trait itself, under `#[async_trait]` with `Send + Sync`
///   supertraits, so `Arc<dyn FooService>` works
/// - `new_foo_service_gateway(service) -> frodo::Gateway`
/// - `FooServiceClient`, which implements `FooService` by calling the
///   remote gateway — hand either one to code expecting the trait
#[proc_macro_attribute]
pub fn service(args: TokenStream, input: TokenStream) -> TokenStream {
    let item = parse_macro_input!(input as ItemTrait);

    if !args.is_empty() {
        return syn::Error::new_spanned(
            &item.ident,
            "#[service] takes no arguments\n\
             \n\
             Routing is declared with doc-comment options:\n\
             /// PREFIX /v2         (on the trait)\n\
             /// GET /game/:id     (on an operation)",
        )
        .to_compile_error()
        .into();
    }

    service::expand_service(item)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

/// Emit the static shape descriptor the request binder uses to resolve
/// dotted query/path keys against a request struct.
///
/// Binding names come from the struct's serde attributes (`rename`,
/// `rename_all`); `#[serde(skip)]` excludes a field from binding
/// entirely. Derive it alongside the serde traits:
///
/// ```ignore
/// #[derive(Default, Serialize, Deserialize, Bindable)]
/// #[serde(default)]
/// pub struct HighScoreRequest {
///     #[serde(rename = "GameID")]
///     pub game_id: String,
///     pub how_many: i64,
/// }
/// ```
#[proc_macro_derive(Bindable)]
pub fn bindable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    bindable::expand_bindable(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}
