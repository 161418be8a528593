use proc_macro::TokenStream;
use syn::{
    Ident, LitStr, Token,
    parse::{Parse, ParseStream},
};

mod service;

/// Attribute macro that derives `rpcmux::Service` from an `impl` block.
///
/// Every `pub` method taking `&self` with one of the two accepted shapes is
/// exposed; all other methods are left alone:
///
/// ```rust,ignore
/// #[rpcmux::service]
/// impl Service1 {
///     pub async fn multiply(&self, _ctx: &Context<'_>, req: &Pair, res: &mut Product) -> Result<(), BoxError> {
///         res.result = req.a * req.b;
///         Ok(())
///     }
///
///     pub fn multiply_with_headers(
///         &self,
///         _ctx: &Context<'_>,
///         req: &Pair,
///         res: &mut Product,
///         headers: &mut HeaderMap,
///     ) -> Result<(), BoxError> {
///         headers.append("set-cookie", HeaderValue::from_static("mycookie=delicious"));
///         res.result = req.a * req.b;
///         Ok(())
///     }
/// }
/// ```
///
/// Method `multiply_with_headers` is exposed as `MultiplyWithHeaders`. Use
/// `#[rpc(name = "...")]` on a method to pick another name, `#[rpc(skip)]` to
/// hide a method that would otherwise qualify, and `#[service(name = "...")]`
/// to change the default service name.
#[proc_macro_attribute]
pub fn service(attr: TokenStream, item: TokenStream) -> TokenStream {
    service::service_impl(attr, item)
}

struct ServiceArgs {
    name: Option<String>,
}

impl Parse for ServiceArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut name = None;

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            match ident.to_string().as_str() {
                "name" => {
                    let lit: LitStr = input.parse()?;
                    name = Some(lit.value());
                }
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute: {}", other),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(ServiceArgs { name })
    }
}
