//! Derive macros for todosync
//!
//! # Available Macros
//!
//! - `#[derive(Action)]` - Generates helpers for action enums (commands/events)
//!
//! # Example
//!
//! ```ignore
//! use todosync_macros::Action;
//!
//! #[derive(Action, Clone, Debug)]
//! enum TodoAction {
//!     #[command]
//!     DeleteTodo { id: TodoId },
//!
//!     #[event]
//!     TodoDeleted { id: TodoId },
//! }
//!
//! // Generated methods:
//! assert!(TodoAction::DeleteTodo { id }.is_command());
//! assert!(TodoAction::TodoDeleted { id }.is_event());
//! assert_eq!(TodoAction::TodoDeleted { id }.name(), "TodoDeleted");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, Variant};

/// Derive macro for Action enums
///
/// Generates helper methods for action enums:
/// - `is_command()` - Returns true if this variant is a command (a user intent)
/// - `is_event()` - Returns true if this variant is an event (an outcome to apply)
/// - `name()` - Returns the variant name, used as a tracing field
///
/// # Attributes
///
/// - `#[command]` - Mark a variant as a command
/// - `#[event]` - Mark a variant as an event
///
/// Every variant must carry exactly one of the two attributes.
///
/// # Errors
///
/// Produces a compile error if:
/// - Applied to a non-enum type
/// - A variant has both `#[command]` and `#[event]`, or neither
#[proc_macro_derive(Action, attributes(command, event))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let Data::Enum(data_enum) = &input.data else {
        return syn::Error::new_spanned(input, "#[derive(Action)] can only be used on enums")
            .to_compile_error()
            .into();
    };

    let mut command_arms = Vec::new();
    let mut event_arms = Vec::new();
    let mut name_arms = Vec::new();

    for variant in &data_enum.variants {
        let is_command = has_attribute(&variant.attrs, "command");
        let is_event = has_attribute(&variant.attrs, "event");

        match (is_command, is_event) {
            (true, true) => {
                return syn::Error::new_spanned(
                    variant,
                    "Variant cannot be both #[command] and #[event]",
                )
                .to_compile_error()
                .into();
            },
            (false, false) => {
                return syn::Error::new_spanned(
                    variant,
                    "Variant must be marked #[command] or #[event]",
                )
                .to_compile_error()
                .into();
            },
            (true, false) => command_arms.push(variant_pattern(variant)),
            (false, true) => event_arms.push(variant_pattern(variant)),
        }

        let pattern = variant_pattern(variant);
        let variant_name = variant.ident.to_string();
        name_arms.push(quote! { #pattern => #variant_name, });
    }

    let command_body = membership_check(&command_arms);
    let event_body = membership_check(&event_arms);

    let expanded = quote! {
        impl #name {
            /// Returns true if this action is a command
            #[must_use]
            pub const fn is_command(&self) -> bool {
                #command_body
            }

            /// Returns true if this action is an event
            #[must_use]
            pub const fn is_event(&self) -> bool {
                #event_body
            }

            /// Returns the variant name
            #[must_use]
            pub const fn name(&self) -> &'static str {
                match self {
                    #(#name_arms)*
                }
            }
        }
    };

    TokenStream::from(expanded)
}

/// `matches!` over the given patterns, or `false` when there are none
fn membership_check(patterns: &[TokenStream2]) -> TokenStream2 {
    if patterns.is_empty() {
        quote! { false }
    } else {
        quote! { ::core::matches!(self, #(#patterns)|*) }
    }
}

/// Pattern matching a variant regardless of its fields
fn variant_pattern(variant: &Variant) -> TokenStream2 {
    let ident = &variant.ident;
    match &variant.fields {
        Fields::Named(_) => quote! { Self::#ident { .. } },
        Fields::Unnamed(_) => quote! { Self::#ident(..) },
        Fields::Unit => quote! { Self::#ident },
    }
}

/// Helper function to check if an attribute list contains a specific attribute
fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}
