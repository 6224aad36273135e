//! Proc-macro backing `#[tessel_testhelpers::test]`.

use unsynn::*;

keyword! {
    KFn = "fn";
}

unsynn! {
    // attributes, visibility and qualifiers in front of `fn`
    struct Prelude {
        tokens: Any<Cons<Except<KFn>, TokenTree>>,
    }

    // generics, parameters, return type and where clause
    struct Signature {
        tokens: Any<Cons<Except<BraceGroup>, TokenTree>>,
    }

    struct TestFn {
        prelude: Prelude,
        _fn: KFn,
        name: Ident,
        signature: Signature,
        body: BraceGroup,
    }
}

impl quote::ToTokens for Prelude {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        self.tokens.to_tokens(tokens)
    }
}

impl quote::ToTokens for Signature {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        self.tokens.to_tokens(tokens)
    }
}

/// Marks a test and installs the tessel tracing subscriber before its body.
///
/// ```ignore
/// #[tessel_testhelpers::test]
/// fn parses_nested_records() {
///     // TESSEL_LOG controls what is printed
/// }
/// ```
///
/// An argument replaces the default `#[test]` attribute:
///
/// ```ignore
/// #[tessel_testhelpers::test(other_runtime::test)]
/// fn runs_elsewhere() {}
/// ```
#[proc_macro_attribute]
pub fn test(
    attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    let item = TokenStream::from(item);
    let mut iter = item.to_token_iter();
    let TestFn {
        prelude,
        _fn,
        name,
        signature,
        body,
    } = match iter.parse::<TestFn>() {
        Ok(parsed) => parsed,
        Err(_) => {
            return quote::quote! {
                ::core::compile_error!("#[tessel_testhelpers::test] expects a function");
            }
            .into();
        }
    };

    let marker = if attr.is_empty() {
        quote::quote! { #[::core::prelude::rust_2024::test] }
    } else {
        let attr = TokenStream::from(attr);
        quote::quote! { #[#attr] }
    };
    let body = body.0.stream();

    quote::quote! {
        #marker
        #prelude fn #name #signature {
            ::tessel_testhelpers::setup();

            #body
        }
    }
    .into()
}
