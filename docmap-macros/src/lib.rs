//! Procedural macros for the docmap project.
//!
//! - `#[derive(Entity)]` builds an entity model from a struct's fields and implements
//!   `EntityEntry` and `Entity` for it.
//! - `#[derive(Enumeration)]` implements `Mappable` for a fieldless enum.
//!
//! Generated code refers to items through the `docmap` facade crate.

#[allow(unused_extern_crates)]
extern crate self as docmap_macros;

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Error, Expr, ExprLit, ExprUnary, Fields, Lit, LitStr, Result, Type, UnOp,
    parse_macro_input, spanned::Spanned,
};

/// Derives `EntityEntry` and `Entity` for a struct with named fields.
///
/// # Attributes
///
/// On the struct:
/// - `#[docmap(name = "...")]` - entity type name (defaults to the struct name)
///
/// On fields:
/// - `#[docmap(key)]` - part of the primary key, in field order
/// - `#[docmap(element = "...")]` - document field name (defaults to the field name)
/// - `#[docmap(not_mapped)]` - never persisted; materialized as `Default::default()`
/// - `#[docmap(local_time)]` - store a `NaiveDateTime` as local time
/// - `#[docmap(nullable)]` - an absent field reads back as "no value" (`Option` fields only)
#[proc_macro_derive(Entity, attributes(docmap))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_entity(input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

/// Derives `Mappable` for a fieldless enum.
///
/// Discriminants follow explicit integer literals, otherwise the previous value plus
/// one. Values are stored as Int32, or as Int64 when any discriminant exceeds the
/// 32-bit range. `#[docmap(as_string)]` stores enumerants by name instead.
#[proc_macro_derive(Enumeration, attributes(docmap))]
pub fn derive_enumeration(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_enumeration(input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

#[derive(Default)]
struct FieldOptions {
    key: bool,
    element: Option<LitStr>,
    not_mapped: bool,
    local_time: bool,
    nullable: bool,
}

fn field_options(attrs: &[Attribute]) -> Result<FieldOptions> {
    let mut options = FieldOptions::default();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("docmap")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("key") {
                options.key = true;
            } else if meta.path.is_ident("element") {
                options.element = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("not_mapped") {
                options.not_mapped = true;
            } else if meta.path.is_ident("local_time") {
                options.local_time = true;
            } else if meta.path.is_ident("nullable") {
                options.nullable = true;
            } else {
                return Err(meta.error("unsupported docmap field attribute"));
            }
            Ok(())
        })?;
    }
    if options.not_mapped && (options.key || options.element.is_some()) {
        return Err(Error::new(
            attrs[0].span(),
            "a not_mapped field cannot be a key or have an element name",
        ));
    }
    Ok(options)
}

fn entity_name(input: &DeriveInput) -> Result<String> {
    let mut name = input.ident.to_string();
    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("docmap")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                name = value.value();
                Ok(())
            } else {
                Err(meta.error("unsupported docmap struct attribute"))
            }
        })?;
    }
    Ok(name)
}

fn is_option(ty: &Type) -> bool {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Option"),
        Type::Group(group) => is_option(&group.elem),
        Type::Paren(paren) => is_option(&paren.elem),
        _ => false,
    }
}

/// Fields written into the same document scope need distinct element names. Members
/// of a composite key share the `_id` sub-document, which the other fields cannot use.
fn check_element_names(elements: &[(String, bool, Span)], compound: bool) -> Result<()> {
    let mut top_level: Vec<&str> = if compound { vec!["_id"] } else { Vec::new() };
    let mut key_scope: Vec<&str> = Vec::new();

    for (element, key, span) in elements {
        let scope = if compound && *key { &mut key_scope } else { &mut top_level };
        if scope.contains(&element.as_str()) {
            return Err(Error::new(*span, format!("element name `{element}` is already in use")));
        }
        scope.push(element);
    }
    Ok(())
}

fn expand_entity(input: DeriveInput) -> Result<TokenStream2> {
    let ident = &input.ident;
    let name = entity_name(&input)?;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    if !input.generics.params.is_empty() {
        return Err(Error::new(input.generics.span(), "Entity cannot be derived for generic structs"));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => return Err(Error::new(ident.span(), "Entity requires a struct with named fields")),
        },
        _ => return Err(Error::new(ident.span(), "Entity can only be derived for structs")),
    };

    let mut properties = Vec::new();
    let mut keys = Vec::new();
    let mut value_arms = Vec::new();
    let mut initializers = Vec::new();
    let mut elements = Vec::new();

    for field in fields {
        let options = field_options(&field.attrs)?;
        let Some(field_ident) = field.ident.as_ref() else {
            continue;
        };
        let ty = &field.ty;
        let property_name = field_ident.to_string();
        if options.nullable && !is_option(ty) {
            return Err(Error::new(ty.span(), "nullable requires an Option field"));
        }

        let mut property = quote! {
            ::docmap::model::Property::new(#property_name, <#ty as ::docmap::value::Mappable>::value_type())
        };
        if let Some(element) = &options.element {
            property = quote! { #property.with_element_name(#element) };
        }
        if options.not_mapped {
            property = quote! { #property.not_mapped() };
        }
        if options.nullable {
            property = quote! { #property.with_nullable(true) };
        }
        if options.local_time {
            property = quote! { #property.with_date_time_kind(::docmap::model::DateTimeKind::Local) };
        }
        properties.push(property);

        if !options.not_mapped {
            let element = options
                .element
                .as_ref()
                .map_or_else(|| property_name.clone(), LitStr::value);
            elements.push((element, options.key, field_ident.span()));
        }

        if options.key {
            keys.push(property_name.clone());
        }

        value_arms.push(quote! {
            #property_name => ::core::result::Result::Ok(::docmap::value::Mappable::to_value(&self.#field_ident)),
        });

        initializers.push(if options.not_mapped {
            quote! { #field_ident: ::core::default::Default::default(), }
        } else {
            quote! {
                #field_ident: mapper.read_property::<#ty>(document, model, #property_name)?,
            }
        });
    }

    check_element_names(&elements, keys.len() > 1)?;

    Ok(quote! {
        impl #impl_generics ::docmap::model::Entity for #ident #ty_generics #where_clause {
            fn model() -> &'static ::docmap::model::EntityType {
                static MODEL: ::std::sync::OnceLock<::docmap::model::EntityType> = ::std::sync::OnceLock::new();
                MODEL.get_or_init(|| {
                    ::docmap::model::EntityType::new(
                        #name,
                        ::std::vec![#(#properties),*],
                        ::std::vec![#(::std::string::String::from(#keys)),*],
                    )
                    .expect("derived entity model is valid")
                })
            }

            fn materialize(document: &::docmap::bson::Document) -> ::docmap::error::MappingResult<Self> {
                let model = <Self as ::docmap::model::Entity>::model();
                let mapper = ::docmap::mapper::EntityMapper::new();
                ::core::result::Result::Ok(Self {
                    #(#initializers)*
                })
            }
        }

        impl #impl_generics ::docmap::model::EntityEntry for #ident #ty_generics #where_clause {
            fn entity_type(&self) -> &::docmap::model::EntityType {
                <Self as ::docmap::model::Entity>::model()
            }

            fn current_value(
                &self,
                property: &::docmap::model::Property,
            ) -> ::docmap::error::MappingResult<::docmap::value::Value> {
                match property.name() {
                    #(#value_arms)*
                    other => ::core::result::Result::Err(::docmap::error::MappingError::PropertyNotFound {
                        entity: ::std::string::String::from(#name),
                        property: ::std::string::String::from(other),
                    }),
                }
            }
        }
    })
}

fn enum_as_string(attrs: &[Attribute]) -> Result<bool> {
    let mut as_string = false;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("docmap")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("as_string") {
                as_string = true;
                Ok(())
            } else {
                Err(meta.error("unsupported docmap enum attribute"))
            }
        })?;
    }
    Ok(as_string)
}

fn discriminant(expr: &Expr) -> Result<i64> {
    match expr {
        Expr::Lit(ExprLit { lit: Lit::Int(int), .. }) => int.base10_parse::<i64>(),
        Expr::Unary(ExprUnary { op: UnOp::Neg(_), expr, .. }) => discriminant(expr).map(|value| -value),
        other => Err(Error::new(other.span(), "Enumeration discriminants must be integer literals")),
    }
}

fn expand_enumeration(input: DeriveInput) -> Result<TokenStream2> {
    let ident = &input.ident;
    let name = ident.to_string();
    let as_string = enum_as_string(&input.attrs)?;

    let data = match &input.data {
        Data::Enum(data) => data,
        _ => return Err(Error::new(ident.span(), "Enumeration can only be derived for enums")),
    };
    if data.variants.is_empty() {
        return Err(Error::new(ident.span(), "Enumeration requires at least one variant"));
    }

    let mut next = 0i64;
    let mut values = Vec::new();
    let mut variants = Vec::new();
    let mut to_arms = Vec::new();
    let mut from_arms = Vec::new();

    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(Error::new(variant.span(), "Enumeration variants cannot have fields"));
        }
        let value = match &variant.discriminant {
            Some((_, expr)) => discriminant(expr)?,
            None => next,
        };
        next = value.wrapping_add(1);
        values.push(value);

        let variant_ident = &variant.ident;
        let variant_name = variant_ident.to_string();
        variants.push(quote! { (#variant_name, #value) });
        to_arms.push(quote! {
            #ident::#variant_ident => ::docmap::value::Value::Enum(::std::string::String::from(#variant_name)),
        });
        from_arms.push(quote! {
            #variant_name => ::core::result::Result::Ok(#ident::#variant_ident),
        });
    }

    let representation = if as_string {
        quote! { ::docmap::types::EnumRepresentation::String }
    } else if values.iter().all(|value| i32::try_from(*value).is_ok()) {
        quote! { ::docmap::types::EnumRepresentation::Int32 }
    } else {
        quote! { ::docmap::types::EnumRepresentation::Int64 }
    };

    Ok(quote! {
        impl ::docmap::value::Mappable for #ident {
            fn value_type() -> ::docmap::types::ValueType {
                ::docmap::types::ValueType::Enum(
                    ::docmap::types::EnumType::new(#name, [#(#variants),*])
                        .with_representation(#representation),
                )
            }

            fn to_value(&self) -> ::docmap::value::Value {
                match self {
                    #(#to_arms)*
                }
            }

            fn from_value(value: ::docmap::value::Value) -> ::docmap::error::MappingResult<Self> {
                match value {
                    ::docmap::value::Value::Enum(enumerant) => match enumerant.as_str() {
                        #(#from_arms)*
                        _ => ::core::result::Result::Err(::docmap::error::MappingError::EnumValueInvalid {
                            enumeration: ::std::string::String::from(#name),
                            value: enumerant,
                        }),
                    },
                    other => ::core::result::Result::Err(::docmap::error::MappingError::type_mismatch(
                        #name,
                        other.kind(),
                    )),
                }
            }
        }
    })
}
