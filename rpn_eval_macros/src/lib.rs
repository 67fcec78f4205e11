use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse_macro_input, FnArg, GenericArgument, ItemFn, LitStr, PatType, PathArguments, Type,
};

enum ArgShape<'a> {
    Required(&'a Type),
    Optional(&'a Type),
    Rest,
}

/// Returns the `T` of a single-parameter generic such as `Option<T>`.
fn generic_inner<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    match &segment.arguments {
        PathArguments::AngleBracketed(args) => match args.args.first() {
            Some(GenericArgument::Type(inner)) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}

fn classify(ty: &Type) -> ArgShape<'_> {
    if let Some(inner) = generic_inner(ty, "Option") {
        ArgShape::Optional(inner)
    } else if generic_inner(ty, "Vec").is_some() {
        ArgShape::Rest
    } else {
        ArgShape::Required(ty)
    }
}

/// Turns a typed function into a registry callback taking `&[Scalar]`.
///
/// Plain parameters are required, `Option<T>` parameters are optional and
/// must follow the required ones, and a final `Vec<Scalar>` collects any
/// remaining arguments. Each parameter type must implement `FromScalar`.
///
/// Errors name the function after the Rust item unless a registry name is
/// given, as in `#[rpn_fn("md5")]`.
#[proc_macro_attribute]
pub fn rpn_fn(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    let vis = &input.vis;
    let fn_name = &input.sig.ident;
    let fn_name_str = if attr.is_empty() {
        fn_name.to_string()
    } else {
        parse_macro_input!(attr as LitStr).value()
    };
    let fn_output = &input.sig.output;
    let fn_body = &input.block;

    let mut extractions = Vec::new();
    let mut required = 0usize;
    let mut total = 0usize;
    let mut has_rest = false;

    for (i, arg) in input.sig.inputs.iter().enumerate() {
        let FnArg::Typed(PatType { pat, ty, .. }) = arg else {
            return syn::Error::new_spanned(arg, "rpn_fn cannot take self")
                .to_compile_error()
                .into();
        };
        let syn::Pat::Ident(ref pat_ident) = **pat else {
            return syn::Error::new_spanned(pat, "rpn_fn parameters must be plain identifiers")
                .to_compile_error()
                .into();
        };
        let arg_name = &pat_ident.ident;

        if has_rest {
            return syn::Error::new_spanned(arg, "the Vec<Scalar> parameter must be last")
                .to_compile_error()
                .into();
        }

        let extraction = match classify(ty) {
            ArgShape::Required(inner) => {
                if total > required {
                    return syn::Error::new_spanned(
                        arg,
                        "required parameters must precede optional ones",
                    )
                    .to_compile_error()
                    .into();
                }
                required += 1;
                total += 1;
                quote! {
                    let #arg_name: #inner =
                        <#inner as crate::rpn::FromScalar>::from_scalar(&args[#i], FUNCTION)?;
                }
            }
            ArgShape::Optional(inner) => {
                total += 1;
                quote! {
                    let #arg_name: Option<#inner> = match args.get(#i) {
                        Some(value) => Some(
                            <#inner as crate::rpn::FromScalar>::from_scalar(value, FUNCTION)?,
                        ),
                        None => None,
                    };
                }
            }
            ArgShape::Rest => {
                has_rest = true;
                quote! {
                    let #arg_name: Vec<crate::rpn::Scalar> =
                        args.get(#i..).map(|rest| rest.to_vec()).unwrap_or_default();
                }
            }
        };
        extractions.push(extraction);
    }

    let arity = if has_rest {
        quote! { crate::rpn::Arity::at_least(#required) }
    } else {
        quote! { crate::rpn::Arity::range(#required, #total) }
    };

    let expanded = quote! {
        #vis fn #fn_name(args: &[crate::rpn::Scalar]) #fn_output {
            const FUNCTION: &str = #fn_name_str;
            let arity = #arity;
            if !arity.accepts(args.len()) {
                return Err(crate::rpn::RpnError::WrongArity {
                    name: FUNCTION.to_string(),
                    given: args.len(),
                    expected: arity,
                });
            }

            #(#extractions)*

            #fn_body
        }
    };

    TokenStream::from(expanded)
}
