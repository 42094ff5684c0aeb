//! The `#[listen]` attribute.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{FnArg, Ident, ItemFn, LitStr, Token, parse::Parse};

/// Arguments for the `#[listen]` macro.
#[derive(Default)]
pub(crate) struct ListenArgs {
    /// Explicit event name.
    pub event: Option<LitStr>,
    pub disable_defaults: bool,
    pub delay_until_ready: bool,
}

impl Parse for ListenArgs {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let mut args = ListenArgs::default();

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            match ident.to_string().as_str() {
                "event" => {
                    input.parse::<Token![=]>()?;
                    args.event = Some(input.parse()?);
                }
                "disable_defaults" => args.disable_defaults = true,
                "delay_until_ready" => args.delay_until_ready = true,
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

        Ok(args)
    }
}

/// The event a function named `name` listens to: leading underscores and
/// `on_` stripped.
pub(crate) fn event_name(name: &str) -> String {
    let trimmed = name.trim_start_matches('_');
    trimmed.strip_prefix("on_").unwrap_or(trimmed).to_owned()
}

pub(crate) fn expand(args: &ListenArgs, input: &ItemFn) -> syn::Result<TokenStream> {
    let fn_name = &input.sig.ident;
    let fn_vis = &input.vis;
    let fn_block = &input.block;

    if input.sig.asyncness.is_none() {
        return Err(syn::Error::new_spanned(
            input.sig.fn_token,
            "listener function must be async",
        ));
    }

    let event_param = match input.sig.inputs.len() {
        0 => quote! { _event: ::herald::Event },
        1 => match input.sig.inputs.first() {
            Some(FnArg::Typed(pat_type)) => {
                let pat = &pat_type.pat;
                let ty = &pat_type.ty;
                quote! { #pat: #ty }
            }
            _ => {
                return Err(syn::Error::new_spanned(
                    &input.sig.inputs,
                    "listener function cannot take self",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.sig.inputs,
                "listener function takes at most one argument: fn(event: Event)",
            ));
        }
    };

    let output_type = match &input.sig.output {
        syn::ReturnType::Default => quote! { ::herald::Outcome },
        syn::ReturnType::Type(_, ty) => quote! { #ty },
    };
    // A function without a return type always succeeds.
    let body = match &input.sig.output {
        syn::ReturnType::Default => quote! {
            #fn_block
            ::core::result::Result::Ok(())
        },
        syn::ReturnType::Type(..) => quote! { #fn_block },
    };

    let event = match &args.event {
        Some(lit) => lit.value(),
        None => event_name(&fn_name.to_string()),
    };
    let disable_defaults = args
        .disable_defaults
        .then(|| quote! { let listener = listener.disable_defaults(); });
    let delay_until_ready = args
        .delay_until_ready
        .then(|| quote! { let listener = listener.delay_until_ready(); });

    Ok(quote! {
        #[allow(non_camel_case_types)]
        #[derive(Clone, Copy, Debug, Default)]
        #[doc = concat!("Listener generated by `#[herald::listen]` on `", stringify!(#fn_name), "`")]
        #fn_vis struct #fn_name;

        impl #fn_name {
            /// The event this listener is registered for.
            pub const EVENT: &'static str = #event;

            /// Builds the listener.
            pub fn listener() -> ::herald::Listener {
                let listener = ::herald::Listener::new(Self::EVENT, #fn_name);
                #disable_defaults
                #delay_until_ready
                listener
            }
        }

        impl ::herald::Handler<::herald::Event> for #fn_name {
            type Output = #output_type;

            async fn call(&self, #event_param) -> Self::Output {
                #body
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_name() {
        assert_eq!(event_name("on_message_create"), "message_create");
        assert_eq!(event_name("_on_ready"), "ready");
        assert_eq!(event_name("__startup"), "startup");
        assert_eq!(event_name("command_error"), "command_error");
    }

    #[test]
    fn test_args() {
        let args: ListenArgs =
            syn::parse_str(r#"event = "ready", disable_defaults, delay_until_ready"#).unwrap();
        assert_eq!(args.event.unwrap().value(), "ready");
        assert!(args.disable_defaults);
        assert!(args.delay_until_ready);
        assert!(syn::parse_str::<ListenArgs>("priority = 1").is_err());
    }

    #[test]
    fn test_sync_functions_are_rejected() {
        let input: ItemFn = syn::parse_str("fn on_ready(event: Event) -> Outcome { Ok(()) }").unwrap();
        assert!(expand(&ListenArgs::default(), &input).is_err());
    }
}
