use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use quote::quote_spanned;

/// Turns a function returning the top-level chains of a run into a test.
///
/// ```ignore
/// #[volley_test("stage library", configure)]
/// fn stage_library() -> Vec<RequestSpec> {
///     vec![RequestSpec::get("http://localhost:18630/login").expect_status(200)]
/// }
/// ```
///
/// The second argument is a function taking `&mut VolleyConfiguration`. The
/// test fails if any verdict of the run fails or the chain is misdeclared.
#[proc_macro_attribute]
pub fn volley_test(attrs: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as syn::ItemFn);
    let args = syn::parse_macro_input!(attrs as syn::AttributeArgs);

    let attributes = &input.attrs;
    let visibility = &input.vis;
    let signature = &input.sig;
    let name = &signature.ident;
    let return_type = &signature.output;
    let block = &input.block;

    if args.len() < 2 {
        return quote! {
            compile_error!("A chain label and a configuration function should be passed to the macro");
        }
        .into();
    }

    let label: String;
    if let syn::NestedMeta::Lit(syn::Lit::Str(parsed_label)) = &args[0] {
        label = parsed_label.value();
        if let Err(stream) = validate_label(&label, parsed_label.span()) {
            return stream.into();
        }
    } else {
        return quote! {
            compile_error!("The first argument should be a string literal!");
        }
        .into();
    }

    let configuration_function;
    if let syn::NestedMeta::Meta(syn::Meta::Path(function_path)) = &args[1] {
        configuration_function = function_path;
    } else {
        let error = quote! {
            compile_error!("The second argument should be a configuration function!");
        };

        return error.into();
    }

    if let Err(stream) = validate_signature(signature) {
        return stream.into();
    }

    let output = quote! {
        #[test]
        #(#attributes)*
        #visibility fn #name() {
            fn __volley_chains() #return_type #block

            volley::init_logging();
            let mut __volley_configuration = volley::VolleyConfiguration::new();
            #configuration_function(&mut __volley_configuration);
            let __volley_runner = volley::Runner::new(__volley_configuration);

            match __volley_runner.run_blocking(__volley_chains()) {
                Ok(report) => {
                    eprintln!("{}\n{}", #label, report);
                    if !report.overall_passed {
                        panic!("Volley chain '{}' failed:\n{}", #label, report);
                    }
                }
                Err(e) => panic!("Volley Error: {}", e),
            }
        }
    };

    TokenStream::from(output)
}

fn validate_label(label: &str, span: Span) -> Result<(), proc_macro2::TokenStream> {
    if label.trim().is_empty() {
        return Err(quote_spanned! {span=>
            compile_error!("The chain label should not be empty!");
        });
    }

    Ok(())
}

fn validate_signature(signature: &syn::Signature) -> Result<(), proc_macro2::TokenStream> {
    let span = signature.ident.span();

    if signature.asyncness.is_some() {
        return Err(quote_spanned! {span=>
            compile_error!("The chain function should not be async, the runner drives it!");
        });
    }

    if !signature.inputs.is_empty() {
        return Err(quote_spanned! {span=>
            compile_error!("The chain function should not take arguments!");
        });
    }

    if let syn::ReturnType::Default = signature.output {
        return Err(quote_spanned! {span=>
            compile_error!("The chain function should return the chains to run!");
        });
    }

    Ok(())
}
