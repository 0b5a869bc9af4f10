use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, parse_quote, spanned::Spanned, Ident, ItemFn, LitStr};

/// Test attribute used across the `rxrt` test-suite.
///
/// Every test gets a `tracing` subscriber writing through the test harness,
/// filtered by `RUST_LOG`. Sync functions expand to `#[test]`; async
/// functions expand to `#[tokio::test]`, where `local` selects the
/// current-thread runtime and `shared` the multi-thread one.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
  let mut input = parse_macro_input!(item as ItemFn);
  let is_async = input.sig.asyncness.is_some();

  let raw_args = proc_macro2::TokenStream::from(attr);
  let flavor = if raw_args.is_empty() {
    proc_macro2::TokenStream::new()
  } else if !is_async {
    return syn::Error::new(
      raw_args.span(),
      "rxrt_macro::test flavor args are only supported for async tests",
    )
    .to_compile_error()
    .into();
  } else {
    let name = if let Ok(ident) = syn::parse2::<Ident>(raw_args.clone()) {
      Some((ident.to_string(), ident.span()))
    } else if let Ok(lit) = syn::parse2::<LitStr>(raw_args.clone()) {
      Some((lit.value(), lit.span()))
    } else {
      None
    };
    match name {
      Some((name, _)) if name == "local" => quote!(flavor = "current_thread"),
      Some((name, _)) if name == "shared" => quote!(flavor = "multi_thread"),
      Some((_, span)) => {
        return syn::Error::new(span, "rxrt_macro::test only accepts `local` or `shared`")
          .to_compile_error()
          .into();
      }
      None => {
        return syn::Error::new(raw_args.span(), "rxrt_macro::test only accepts `local` or `shared`")
          .to_compile_error()
          .into();
      }
    }
  };

  let init: syn::Stmt = parse_quote! {
    let _ = ::tracing_subscriber::fmt()
      .with_env_filter(::tracing_subscriber::EnvFilter::from_default_env())
      .with_test_writer()
      .try_init();
  };
  input.block.stmts.insert(0, init);

  let harness = if is_async { quote!(#[::tokio::test(#flavor)]) } else { quote!(#[test]) };

  quote! {
    #harness
    #input
  }
  .into()
}
