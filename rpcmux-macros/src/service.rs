//! Service-related macros.
//!
//! This module contains:
//! - `#[service]` - Attribute macro building a method table from an `impl` block

use crate::ServiceArgs;
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    FnArg, ImplItem, ImplItemFn, ItemImpl, LitStr, PathArguments, ReturnType, Type, TypePath,
    TypeReference, Visibility, parse_macro_input,
};

/// Per-method options from `#[rpc(...)]`.
#[derive(Default)]
struct RpcAttr {
    name: Option<String>,
    skip: bool,
}

/// A method that matched one of the accepted shapes.
struct Exposed<'a> {
    method: &'a ImplItemFn,
    name: String,
    arg: Type,
    reply: Type,
    with_headers: bool,
}

/// Implementation of the `#[service]` macro.
pub fn service_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as ServiceArgs);
    let mut input = parse_macro_input!(item as ItemImpl);

    if input.trait_.is_some() {
        return syn::Error::new_spanned(
            &input.self_ty,
            "#[service] goes on an inherent impl block, not a trait impl",
        )
        .to_compile_error()
        .into();
    }
    if !input.generics.params.is_empty() {
        return syn::Error::new_spanned(
            &input.generics,
            "#[service] does not support generic impl blocks",
        )
        .to_compile_error()
        .into();
    }

    let self_ty = (*input.self_ty).clone();
    let service_name = match args.name {
        Some(name) => name,
        None => match type_ident(&self_ty) {
            Some(ident) => ident,
            None => {
                return syn::Error::new_spanned(
                    &self_ty,
                    "#[service] needs a named type; use #[service(name = \"...\")]",
                )
                .to_compile_error()
                .into();
            }
        },
    };

    // Pull our helper attributes off the methods before re-emitting them.
    let mut options = Vec::new();
    for item in &mut input.items {
        if let ImplItem::Fn(method) = item {
            match take_rpc_attr(method) {
                Ok(opts) => options.push(opts),
                Err(err) => return err.to_compile_error().into(),
            }
        }
    }

    let exposed: Vec<Exposed<'_>> = input
        .items
        .iter()
        .filter_map(|item| match item {
            ImplItem::Fn(method) => Some(method),
            _ => None,
        })
        .zip(options)
        .filter(|(_, opts)| !opts.skip)
        .filter_map(|(method, opts)| classify(method, opts, &self_ty))
        .collect();

    let entries = exposed.iter().map(|m| method_entry(m, &self_ty));
    let name_lit = LitStr::new(&service_name, proc_macro2::Span::call_site());

    let expanded = quote! {
        #input

        impl ::rpcmux::Service for #self_ty {
            fn type_name() -> &'static str {
                #name_lit
            }

            fn methods() -> ::std::vec::Vec<::rpcmux::Method<Self>> {
                ::std::vec![#(#entries),*]
            }
        }
    };

    TokenStream::from(expanded)
}

fn take_rpc_attr(method: &mut ImplItemFn) -> syn::Result<RpcAttr> {
    let mut opts = RpcAttr::default();
    let mut error = None;

    method.attrs.retain(|attr| {
        if !attr.path().is_ident("rpc") {
            return true;
        }
        let parsed = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                opts.skip = true;
                Ok(())
            } else if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                opts.name = Some(lit.value());
                Ok(())
            } else {
                Err(meta.error("unknown rpc attribute, expected `name` or `skip`"))
            }
        });
        if let Err(err) = parsed {
            error.get_or_insert(err);
        }
        false
    });

    match error {
        Some(err) => Err(err),
        None => Ok(opts),
    }
}

/// Check a method against the two accepted shapes.
///
/// Returns `None` for every method that should not be exposed.
fn classify<'a>(method: &'a ImplItemFn, opts: RpcAttr, self_ty: &Type) -> Option<Exposed<'a>> {
    let sig = &method.sig;
    if !matches!(method.vis, Visibility::Public(_)) || !sig.generics.params.is_empty() {
        return None;
    }

    let mut inputs = sig.inputs.iter();
    match inputs.next()? {
        FnArg::Receiver(recv) if recv.reference.is_some() && recv.mutability.is_none() => {}
        _ => return None,
    }

    let typed: Vec<&Type> = inputs
        .map(|arg| match arg {
            FnArg::Typed(pat) => Some(&*pat.ty),
            FnArg::Receiver(_) => None,
        })
        .collect::<Option<_>>()?;

    let with_headers = match typed.len() {
        3 => false,
        4 => true,
        _ => return None,
    };

    if !last_segment_is(shared_ref(typed[0])?, "Context") {
        return None;
    }
    let arg = concrete(shared_ref(typed[1])?, self_ty)?;
    let reply = concrete(mut_ref(typed[2])?, self_ty)?;
    if with_headers && !last_segment_is(mut_ref(typed[3])?, "HeaderMap") {
        return None;
    }
    if !returns_unit_result(&sig.output) {
        return None;
    }

    Some(Exposed {
        method,
        name: opts
            .name
            .unwrap_or_else(|| upper_camel(&sig.ident.to_string())),
        arg,
        reply,
        with_headers,
    })
}

fn method_entry(m: &Exposed<'_>, self_ty: &Type) -> TokenStream2 {
    let ident = &m.method.sig.ident;
    let shim = format_ident!("__rpcmux_{}", ident);
    let name = &m.name;
    let arg = &m.arg;
    let reply = &m.reply;
    let dot_await = m.method.sig.asyncness.map(|_| quote!(.await));

    let (headers_param, headers_arg, constructor) = if m.with_headers {
        (
            quote!(headers: &'a mut ::rpcmux::http::HeaderMap,),
            quote!(headers),
            quote!(with_headers),
        )
    } else {
        (quote!(), quote!(), quote!(new))
    };

    quote! {
        {
            fn #shim<'a>(
                this: &'a #self_ty,
                ctx: &'a ::rpcmux::Context<'a>,
                args: &'a #arg,
                reply: &'a mut #reply,
                #headers_param
            ) -> ::rpcmux::BoxFuture<'a, ::core::result::Result<(), ::rpcmux::BoxError>> {
                ::std::boxed::Box::pin(async move {
                    <#self_ty>::#ident(this, ctx, args, reply, #headers_arg)
                        #dot_await
                        .map_err(::core::convert::Into::into)
                })
            }
            ::rpcmux::Method::#constructor(#name, #shim)
        }
    }
}

fn shared_ref(ty: &Type) -> Option<&Type> {
    match ty {
        Type::Reference(TypeReference {
            mutability: None,
            elem,
            ..
        }) => Some(elem),
        _ => None,
    }
}

fn mut_ref(ty: &Type) -> Option<&Type> {
    match ty {
        Type::Reference(TypeReference {
            mutability: Some(_),
            elem,
            ..
        }) => Some(elem),
        _ => None,
    }
}

fn last_segment_is(ty: &Type, name: &str) -> bool {
    match ty {
        Type::Path(TypePath { qself: None, path }) => {
            path.segments.last().is_some_and(|seg| seg.ident == name)
        }
        _ => false,
    }
}

/// Argument and reply types must be plain named types.
///
/// A bare `Self` is replaced by the impl's type since the generated shim
/// lives outside the impl block.
fn concrete(ty: &Type, self_ty: &Type) -> Option<Type> {
    match ty {
        Type::Path(TypePath { qself: None, path }) if path.is_ident("Self") => {
            Some(self_ty.clone())
        }
        Type::Path(TypePath { qself: None, path })
            if path.segments.first().is_some_and(|seg| seg.ident != "Self") =>
        {
            Some(ty.clone())
        }
        _ => None,
    }
}

fn returns_unit_result(output: &ReturnType) -> bool {
    let ReturnType::Type(_, ty) = output else {
        return false;
    };
    let Type::Path(TypePath { qself: None, path }) = &**ty else {
        return false;
    };
    let Some(seg) = path.segments.last() else {
        return false;
    };
    if seg.ident != "Result" {
        return false;
    }
    match &seg.arguments {
        PathArguments::AngleBracketed(args) => match args.args.first() {
            Some(syn::GenericArgument::Type(Type::Tuple(unit))) => unit.elems.is_empty(),
            _ => false,
        },
        _ => false,
    }
}

fn type_ident(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(TypePath { qself: None, path }) => {
            path.segments.last().map(|seg| seg.ident.to_string())
        }
        _ => None,
    }
}

fn upper_camel(ident: &str) -> String {
    let ident = ident.strip_prefix("r#").unwrap_or(ident);
    let mut out = String::with_capacity(ident.len());
    let mut upper = true;
    for ch in ident.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}
