use proc_macro::TokenStream;

mod categorized;

/// Derive macro implementing `Categorized` for an error type
///
/// Structs name their category on the type. Enums name one per variant, and
/// may name a type-level category used by variants without their own.
///
/// # Example
/// ```ignore
/// use meshestra_exception::{Categorized, category::{ARGUMENT_INVALID, FAILURE, NOT_FOUND}};
///
/// #[derive(Debug, Categorized)]
/// #[category(ARGUMENT_INVALID)]
/// pub struct BadInput;
///
/// #[derive(Debug, Categorized)]
/// #[category(FAILURE)]
/// pub enum RepoError {
///     #[category(NOT_FOUND)]
///     Missing { id: u64 },
///     Io(std::io::Error),
/// }
/// ```
#[proc_macro_derive(Categorized, attributes(category))]
pub fn derive_categorized(input: TokenStream) -> TokenStream {
    categorized::derive_categorized(input)
}
