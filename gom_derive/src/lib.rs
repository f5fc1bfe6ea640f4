// gom_derive/src/lib.rs
extern crate proc_macro;
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Attribute,
    Data,
    DeriveInput,
    Field,
    Fields,
    GenericArgument,
    Ident,
    LitStr,
    Path,
    PathArguments,
    Type,
    parse_macro_input
};

/// `#[derive(Reflect)]` – declares the fields of a struct as properties of its
/// meta class.
///
/// `Cell<T>` and `RefCell<T>` fields become read-write properties, other
/// fields read-only ones. Field attributes:
/// - `#[gom(skip)]` leaves the field out
/// - `#[gom(base)]` marks the `ObjectBase` field (left out as well)
/// - `#[gom(read_only)]` forbids writes
/// - `#[gom(name = "...")]` renames the property
///
/// `#[gom(methods = path)]` on the struct calls
/// `path(&MetaClass, &TypeRegistry)` to declare methods and slots.
#[proc_macro_derive(Reflect, attributes(gom))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let fields = match named_fields(&input, "Reflect") {
        Ok(fields) => fields,
        Err(e) => return e.to_compile_error().into(),
    };
    let methods = match struct_methods(&input.attrs) {
        Ok(methods) => methods,
        Err(e) => return e.to_compile_error().into(),
    };

    let mut declarations = Vec::new();
    for field in fields {
        let attrs = match FieldAttrs::parse(&field.attrs) {
            Ok(attrs) => attrs,
            Err(e) => return e.to_compile_error().into(),
        };
        if attrs.skip || attrs.base || is_object_base(&field.ty) {
            continue;
        }
        declarations.push(property_declaration(field, &attrs));
    }

    let methods_call = methods.map(|path| quote! { #path(mclass, registry); });
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics ::gom::reflection::reflect::Reflect for #name #ty_generics #where_clause {
            fn declare_members(
                mclass: &::gom::reflection::meta_class::MetaClass,
                registry: &::gom::reflection::registry::TypeRegistry,
            ) {
                let _ = registry;
                #(#declarations)*
                #methods_call
            }
        }
    };

    TokenStream::from(expanded)
}

/// `#[derive(GomObject)]` – implements `ObjectCore` on top of the struct's
/// `ObjectBase` field, the one marked `#[gom(base)]` or else the one named
/// `base`.
#[proc_macro_derive(GomObject, attributes(gom))]
pub fn derive_gom_object(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let fields = match named_fields(&input, "GomObject") {
        Ok(fields) => fields,
        Err(e) => return e.to_compile_error().into(),
    };

    let mut base: Option<&Ident> = None;
    for field in &fields {
        let attrs = match FieldAttrs::parse(&field.attrs) {
            Ok(attrs) => attrs,
            Err(e) => return e.to_compile_error().into(),
        };
        if attrs.base {
            base = field.ident.as_ref();
            break;
        }
    }
    let base = base.or_else(|| {
        fields
            .iter()
            .filter_map(|f| f.ident.as_ref())
            .find(|ident| *ident == "base")
    });
    let Some(base) = base else {
        return syn::Error::new_spanned(name, "GomObject needs an ObjectBase field named `base` or marked #[gom(base)]")
            .to_compile_error()
            .into();
    };

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics ::gom::types::object::ObjectCore for #name #ty_generics #where_clause {
            fn object_base(&self) -> &::gom::types::object::ObjectBase {
                &self.#base
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_object(&self) -> &dyn ::gom::types::object::Object {
                self
            }
        }
    };

    TokenStream::from(expanded)
}

fn named_fields<'a>(input: &'a DeriveInput, derive: &str) -> syn::Result<Vec<&'a Field>> {
    match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(named) => Ok(named.named.iter().collect()),
            _ => Err(syn::Error::new_spanned(
                s.struct_token,
                format!("{derive} can only be derived for structs with named fields"),
            )),
        },
        _ => Err(syn::Error::new_spanned(
            &input.ident,
            format!("{derive} can only be derived for structs"),
        )),
    }
}

#[derive(Default)]
struct FieldAttrs {
    skip: bool,
    base: bool,
    read_only: bool,
    name: Option<String>,
}

impl FieldAttrs {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut result = FieldAttrs::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("gom")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    result.skip = true;
                } else if meta.path.is_ident("base") {
                    result.base = true;
                } else if meta.path.is_ident("read_only") {
                    result.read_only = true;
                } else if meta.path.is_ident("name") {
                    let lit: LitStr = meta.value()?.parse()?;
                    result.name = Some(lit.value());
                } else {
                    return Err(meta.error("unknown gom field attribute"));
                }
                Ok(())
            })?;
        }
        Ok(result)
    }
}

/// Path given by `#[gom(methods = path)]` on the struct.
fn struct_methods(attrs: &[Attribute]) -> syn::Result<Option<Path>> {
    let mut methods = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("gom")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("methods") {
                methods = Some(meta.value()?.parse::<Path>()?);
                Ok(())
            } else {
                Err(meta.error("unknown gom struct attribute"))
            }
        })?;
    }
    Ok(methods)
}

enum Storage<'a> {
    Cell(&'a Type),
    RefCell(&'a Type),
    Plain(&'a Type),
}

fn storage(ty: &Type) -> Storage<'_> {
    if let Type::Path(path) = ty {
        if let Some(last) = path.path.segments.last() {
            if let PathArguments::AngleBracketed(args) = &last.arguments {
                if let Some(GenericArgument::Type(inner)) = args.args.first() {
                    if last.ident == "Cell" {
                        return Storage::Cell(inner);
                    }
                    if last.ident == "RefCell" {
                        return Storage::RefCell(inner);
                    }
                }
            }
        }
    }
    Storage::Plain(ty)
}

fn is_object_base(ty: &Type) -> bool {
    matches!(ty, Type::Path(path) if path.path.segments.last().is_some_and(|s| s.ident == "ObjectBase"))
}

fn property_declaration(field: &Field, attrs: &FieldAttrs) -> TokenStream2 {
    // Named fields always have an ident.
    let Some(ident) = field.ident.as_ref() else {
        return TokenStream2::new();
    };
    let prop_name = attrs.name.clone().unwrap_or_else(|| ident.to_string());

    let (ty, getter, setter) = match storage(&field.ty) {
        Storage::Cell(ty) => (
            ty,
            quote! { |this: &Self| this.#ident.get() },
            Some(quote! { |this: &Self, value: #ty| this.#ident.set(value) }),
        ),
        Storage::RefCell(ty) => (
            ty,
            quote! { |this: &Self| this.#ident.borrow().clone() },
            Some(quote! { |this: &Self, value: #ty| *this.#ident.borrow_mut() = value }),
        ),
        Storage::Plain(ty) => (ty, quote! { |this: &Self| this.#ident.clone() }, None),
    };

    match setter {
        Some(setter) if !attrs.read_only => quote! {
            mclass.add_native_property::<Self, #ty>(#prop_name, #getter, #setter);
        },
        _ => quote! {
            mclass.add_native_read_only_property::<Self, #ty>(#prop_name, #getter);
        },
    }
}
