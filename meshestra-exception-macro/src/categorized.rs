use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Path};

pub fn derive_categorized(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match generate_categorized_impl(&input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(e) => TokenStream::from(e.to_compile_error()),
    }
}

fn generate_categorized_impl(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let type_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let type_category = category_attribute(&input.attrs)?;

    let body = match &input.data {
        Data::Struct(_) => {
            let category = type_category.ok_or_else(|| {
                syn::Error::new_spanned(
                    type_name,
                    "#[derive(Categorized)] on a struct requires #[category(PATH)]",
                )
            })?;
            quote!(&#category)
        }
        Data::Enum(data) => {
            let mut arms = Vec::with_capacity(data.variants.len());
            for variant in &data.variants {
                let variant_name = &variant.ident;
                let category = match category_attribute(&variant.attrs)? {
                    Some(path) => path,
                    None => type_category.clone().ok_or_else(|| {
                        syn::Error::new_spanned(
                            variant_name,
                            "variant needs #[category(PATH)] or the enum needs a default one",
                        )
                    })?,
                };
                arms.push(quote! {
                    Self::#variant_name { .. } => &#category
                });
            }
            if arms.is_empty() {
                // Uninhabited: there is no value to categorize.
                quote!(match *self {})
            } else {
                quote! {
                    match self {
                        #(#arms),*
                    }
                }
            }
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                type_name,
                "#[derive(Categorized)] does not support unions",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics ::meshestra_exception::Categorized
            for #type_name #ty_generics #where_clause
        {
            fn category(&self) -> &'static ::meshestra_exception::FailureCategory {
                #body
            }
        }
    })
}

/// Read `#[category(PATH)]`, rejecting duplicates.
fn category_attribute(attrs: &[Attribute]) -> syn::Result<Option<Path>> {
    let mut found = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("category")) {
        if found.is_some() {
            return Err(syn::Error::new_spanned(attr, "duplicate #[category] attribute"));
        }
        found = Some(attr.parse_args::<Path>()?);
    }
    Ok(found)
}
