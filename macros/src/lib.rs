use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, spanned::Spanned, Ident, ItemFn, LitStr};

const USAGE: &str = "rxresult_macro::test only accepts: #[rxresult_macro::test], \
                     #[rxresult_macro::test(local)], #[rxresult_macro::test(shared)], or \
                     string equivalents";

/// Marks a test that may be sync or async.
///
/// Sync tests expand to `#[test]`. Async tests run on a Tokio runtime: the
/// current-thread flavor by default or with `local`, a two-worker
/// multi-thread runtime with `shared`. Cells and attachments spawn onto
/// whatever runtime is current, so `shared` is the flavor to pick when a
/// test needs the blocking pool and the dispatching task to progress in
/// parallel.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
  let input = parse_macro_input!(item as ItemFn);

  let is_async = input.sig.asyncness.is_some();
  let raw_args = proc_macro2::TokenStream::from(attr);

  if !is_async {
    if !raw_args.is_empty() {
      return syn::Error::new(
        raw_args.span(),
        "rxresult_macro::test flavor args are only supported for async tests",
      )
      .to_compile_error()
      .into();
    }
    return quote!(#[test] #input).into();
  }

  let flavor = if raw_args.is_empty() {
    Some("local".to_string())
  } else if let Ok(ident) = syn::parse2::<Ident>(raw_args.clone()) {
    Some(ident.to_string())
  } else if let Ok(lit) = syn::parse2::<LitStr>(raw_args.clone()) {
    Some(lit.value())
  } else {
    None
  };

  let tokio_args = match flavor.as_deref() {
    Some("local") => quote!(flavor = "current_thread"),
    Some("shared") => quote!(flavor = "multi_thread", worker_threads = 2),
    _ => return syn::Error::new(raw_args.span(), USAGE).to_compile_error().into(),
  };

  quote! {
    #[tokio::test(#tokio_args)]
    #input
  }
  .into()
}
