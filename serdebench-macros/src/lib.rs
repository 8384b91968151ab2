//! serdebench Macros
//!
//! `#[serdebench::unit]` registers a work unit so that a freshly spawned
//! worker process can find it by id.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{FnArg, ItemFn, ReturnType, parse_macro_input};

mod attr {
    use syn::meta::ParseNestedMeta;

    /// Get the attribute name as a string
    pub fn name(meta: &ParseNestedMeta) -> String {
        meta.path
            .get_ident()
            .map(|i| i.to_string())
            .unwrap_or_default()
    }

    /// Parse a string literal attribute: `attr = "value"`
    pub fn string(meta: &ParseNestedMeta) -> syn::Result<String> {
        let value: syn::LitStr = meta.value()?.parse()?;
        Ok(value.value())
    }

    pub fn unknown(meta: &ParseNestedMeta, name: &str) -> syn::Error {
        meta.error(format!("unknown attribute: {}", name))
    }
}

/// Register a work unit
///
/// # Example
///
/// ```ignore
/// #[serdebench::unit]
/// fn allocate(s: &mut Sampler) {
///     s.measure(|| vec![0u8; 1 << 20]);
/// }
///
/// #[serdebench::unit(id = "load_csv", group = "csv")]
/// fn load(s: &mut Sampler) -> anyhow::Result<()> {
///     let path: PathBuf = s.args()?;
///     s.measure(|| csv::load(&path))?;
///     Ok(())
/// }
/// ```
///
/// The body may return `()` or `Result<(), E>` for any `E` convertible into
/// a boxed error.
#[proc_macro_attribute]
pub fn unit(args: TokenStream, item: TokenStream) -> TokenStream {
    let args = TokenStream2::from(args);
    let func = parse_macro_input!(item as ItemFn);

    unit_impl(args, func)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

fn unit_impl(args: TokenStream2, func: ItemFn) -> Result<TokenStream2, syn::Error> {
    validate_signature(&func)?;
    let config = parse_unit_config(args)?;

    let fn_name = &func.sig.ident;
    let fn_name_str = fn_name.to_string();
    let wrapper_name = format_ident!("_serdebench_unit_{}", fn_name);

    let id = config.id.unwrap_or_else(|| fn_name_str.clone());
    let group = config.group.unwrap_or_else(|| "default".to_string());

    Ok(quote! {
        #func

        #[doc(hidden)]
        #[allow(non_snake_case)]
        fn #wrapper_name(
            sampler: &mut ::serdebench::Sampler,
        ) -> ::std::result::Result<(), ::serdebench::BoxError> {
            ::serdebench::UnitOutcome::into_result(#fn_name(sampler))
        }

        ::serdebench::internal::inventory::submit! {
            ::serdebench::UnitDef {
                id: #id,
                name: #fn_name_str,
                group: #group,
                runner_fn: #wrapper_name,
                file: file!(),
                line: line!(),
                module_path: module_path!(),
            }
        }
    })
}

#[derive(Default)]
struct UnitConfig {
    id: Option<String>,
    group: Option<String>,
}

fn parse_unit_config(args: TokenStream2) -> Result<UnitConfig, syn::Error> {
    let mut config = UnitConfig::default();

    if args.is_empty() {
        return Ok(config);
    }

    let parser = syn::meta::parser(|meta| {
        let name = attr::name(&meta);
        match name.as_str() {
            "id" => config.id = Some(attr::string(&meta)?),
            "group" => config.group = Some(attr::string(&meta)?),
            _ => return Err(attr::unknown(&meta, &name)),
        }
        Ok(())
    });

    syn::parse::Parser::parse2(parser, args)?;

    if let Some(id) = &config.id {
        if id.is_empty() || id.chars().any(char::is_whitespace) {
            return Err(syn::Error::new(
                proc_macro2::Span::call_site(),
                "serdebench: unit id must be non-empty and contain no whitespace",
            ));
        }
    }

    Ok(config)
}

fn validate_signature(func: &ItemFn) -> syn::Result<()> {
    if func.sig.asyncness.is_some() {
        return Err(syn::Error::new_spanned(
            func.sig.asyncness,
            "serdebench: units must be synchronous functions",
        ));
    }
    if !func.sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &func.sig.generics,
            "serdebench: units cannot be generic",
        ));
    }

    let mut inputs = func.sig.inputs.iter();
    match (inputs.next(), inputs.next()) {
        (Some(FnArg::Typed(arg)), None) if is_mut_reference(&arg.ty) => {}
        _ => {
            return Err(syn::Error::new_spanned(
                &func.sig,
                "serdebench: Function must take exactly one argument: `&mut Sampler`",
            ));
        }
    }

    if let ReturnType::Type(_, ty) = &func.sig.output {
        if let syn::Type::ImplTrait(_) = ty.as_ref() {
            return Err(syn::Error::new_spanned(
                ty,
                "serdebench: unit must return `()` or `Result<(), E>`",
            ));
        }
    }

    Ok(())
}

fn is_mut_reference(ty: &syn::Type) -> bool {
    matches!(ty, syn::Type::Reference(r) if r.mutability.is_some())
}
