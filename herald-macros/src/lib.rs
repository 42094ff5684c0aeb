//! Procedural macros for Herald.
//!
//! - `#[listen]` - Turns an async function into a registrable listener

use proc_macro::TokenStream;
use syn::{ItemFn, parse_macro_input};

mod listen;

/// Turns an `async fn(Event) -> Outcome` into a listener.
///
/// The function becomes a unit struct of the same name implementing
/// `Handler<Event>`, with an `EVENT` constant and a `listener()` constructor.
/// The event name is taken from the function name with leading underscores
/// and `on_` stripped, unless given explicitly.
///
/// # Example
///
/// ```rust,ignore
/// #[herald::listen]
/// async fn on_message_create(event: Event) -> Outcome {
///     Ok(())
/// }
///
/// #[herald::listen(event = "command_error", disable_defaults)]
/// async fn report(event: Event) -> Outcome {
///     Ok(())
/// }
///
/// client.add_listener(on_message_create::listener());
/// ```
///
/// # Arguments
///
/// - `event = "name"` - Explicit event name
/// - `disable_defaults` - Evicts the library's default listeners of the event
/// - `delay_until_ready` - Holds invocations back until the client is ready
#[proc_macro_attribute]
pub fn listen(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as listen::ListenArgs);
    let input = parse_macro_input!(item as ItemFn);
    listen::expand(&args, &input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
