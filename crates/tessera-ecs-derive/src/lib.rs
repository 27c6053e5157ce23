//! Derive macro for Tessera ECS lifecycle hooks.
//!
//! `#[derive(Lifecycle)]` implements `tessera_ecs::Lifecycle`, turning a list
//! of capability keys into calls on the registration builder. The type still
//! implements each capability trait by hand; the derive only wires it up.
//!
//! ```ignore
//! #[derive(Clone, Lifecycle)]
//! #[lifecycle(clone, on_remove)]
//! struct Health { current: u32, invulnerable: bool }
//!
//! impl OnRemove for Health {
//!     fn on_remove(&mut self) -> bool {
//!         !self.invulnerable
//!     }
//! }
//!
//! world.register_type::<Health>();
//! ```
//!
//! # Keys
//!
//! | key          | trait      | builder call    |
//! |--------------|------------|-----------------|
//! | `pooled`     | `Pooled`   | `.pooled()`     |
//! | `on_remove`  | `OnRemove` | `.on_remove()`  |
//! | `toggle`     | `Toggle`   | `.toggle()`     |
//! | `clone`      | `Clone`    | `.cloneable()`  |
//! | `post_clone` | `PostClone`| `.post_clone()` |
//! | `activate`   | `Activate` | `.activation()` |

use proc_macro::TokenStream;
use quote::{format_ident, quote, quote_spanned};
use syn::{Attribute, Data, DeriveInput, Ident, spanned::Spanned};

/// Capability keys accepted inside `#[lifecycle(...)]`, with the builder
/// method each one calls.
const KEYS: &[(&str, &str)] = &[
    ("pooled", "pooled"),
    ("on_remove", "on_remove"),
    ("toggle", "toggle"),
    ("clone", "cloneable"),
    ("post_clone", "post_clone"),
    ("activate", "activation"),
];

/// Collect the builder calls named by every `#[lifecycle(...)]` attribute.
fn parse_keys(attrs: &[Attribute]) -> syn::Result<Vec<Ident>> {
    let mut calls: Vec<Ident> = Vec::new();
    let mut seen: Vec<String> = Vec::new();

    for attr in attrs {
        if !attr.path().is_ident("lifecycle") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            let Some(key) = meta.path.get_ident().map(ToString::to_string) else {
                return Err(meta.error("expected a capability key"));
            };
            let Some(&(_, method)) = KEYS.iter().find(|(name, _)| *name == key) else {
                let known = KEYS
                    .iter()
                    .map(|(name, _)| *name)
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(meta.error(format!(
                    "unknown lifecycle capability `{key}`. Expected one of: {known}"
                )));
            };
            if seen.contains(&key) {
                return Err(meta.error(format!("lifecycle capability `{key}` listed twice")));
            }

            seen.push(key);
            calls.push(format_ident!("{}", method, span = meta.path.span()));
            Ok(())
        })?;
    }

    if seen.iter().any(|key| key == "post_clone") && !seen.iter().any(|key| key == "clone") {
        return Err(syn::Error::new(
            proc_macro2::Span::call_site(),
            "`post_clone` only runs after a clone. Add `clone` to #[lifecycle(...)]",
        ));
    }

    Ok(calls)
}

/// Derive macro for component lifecycle capabilities.
///
/// # Examples
///
/// ```ignore
/// // No hooks: plain data, never cloned
/// #[derive(Lifecycle)]
/// struct Marker;
///
/// // Pooled and toggled
/// #[derive(Lifecycle)]
/// #[lifecycle(pooled, toggle)]
/// struct Emitter { rate: f32, enabled: bool }
/// ```
#[proc_macro_derive(Lifecycle, attributes(lifecycle))]
pub fn derive_lifecycle(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    if let Data::Union(_) = &input.data {
        return TokenStream::from(quote_spanned! {
            input.span() =>
            compile_error!("Unions cannot derive Lifecycle. Use a struct or enum instead.");
        });
    }

    if let Some(lifetime) = input.generics.lifetimes().next() {
        return TokenStream::from(quote_spanned! {
            lifetime.span() =>
            compile_error!("Components must be 'static. Store owned data or an Entity instead of a borrow.");
        });
    }

    let calls = match parse_keys(&input.attrs) {
        Ok(calls) => calls,
        Err(err) => return TokenStream::from(err.to_compile_error()),
    };

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics ::tessera_ecs::Lifecycle for #name #ty_generics #where_clause {
            fn lifecycle(
                registration: ::tessera_ecs::Registration<'_, Self>,
            ) -> ::tessera_ecs::Registration<'_, Self> {
                registration #(.#calls())*
            }
        }
    };

    TokenStream::from(expanded)
}
