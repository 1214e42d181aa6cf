use syn::ext::IdentExt;

use super::*;

/// Derive `Shape` for a struct with named fields.
pub fn expand(item: &syn::DeriveInput) -> Result<proc_macro2::TokenStream> {
    let fields = match &item.data {
        syn::Data::Struct(syn::DataStruct {
            fields: syn::Fields::Named(fields), ..
        }) => &fields.named,
        syn::Data::Struct(_) => {
            bail!(item.ident, "only structs with named fields are supported")
        }
        _ => bail!(item.ident, "`Dependents` can only be derived for structs"),
    };

    // Each field is inserted under its own name.
    let mut inserts = vec![];
    for field in fields {
        let Some(ident) = &field.ident else {
            bail!(field, "dependents must be named");
        };
        let name = ident.unraw().to_string();
        inserts.push(quote! {
            dependents.insert(#name, self.#ident);
        });
    }

    let ty = &item.ident;
    let (impl_generics, ty_generics, where_clause) = item.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::memoselect::Shape for #ty #ty_generics #where_clause {
            fn into_dependents(self) -> ::core::option::Option<::memoselect::Dependents> {
                #[allow(unused_mut)]
                let mut dependents = ::memoselect::Dependents::new();
                #(#inserts)*
                ::core::option::Option::Some(dependents)
            }
        }
    })
}
