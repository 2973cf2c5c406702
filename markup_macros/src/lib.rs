use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{FnArg, ItemFn, LitStr, Pat, Type, parse_macro_input};

/// Build a `markup_lit::Template` from a string literal with `${expr}`
/// interpolations.
///
/// Each `${...}` is parsed as a Rust expression and converted with
/// `ToValue`, so operands are borrowed, not moved. The expression text is
/// kept for diagnostics. Write `$${` for a literal `${`.
///
/// # Example
/// ```ignore
/// let count = 3;
/// let template = markup!("<p>Count: ${count}</p>");
/// let node = session.html(&template)?;
/// ```
#[proc_macro]
pub fn markup(input: TokenStream) -> TokenStream {
    let literal = parse_macro_input!(input as LitStr);

    let pieces = match split_template(&literal.value()) {
        Ok(pieces) => pieces,
        Err(message) => return syn::Error::new(literal.span(), message).to_compile_error().into(),
    };

    let mut values = Vec::with_capacity(pieces.sources.len());
    for source in &pieces.sources {
        match syn::parse_str::<syn::Expr>(source) {
            Ok(expr) => values.push(quote! { markup_lit::ToValue::to_value(&(#expr)) }),
            Err(e) => {
                return syn::Error::new(
                    literal.span(),
                    format!("invalid interpolation `${{{source}}}`: {e}"),
                )
                .to_compile_error()
                .into();
            }
        }
    }

    let segments = &pieces.segments;
    let sources = &pieces.sources;
    let output = quote! {
        markup_lit::Template::new(
            &[#(#segments),*],
            vec![#(#values),*],
        )
        .with_sources(&[#(#sources),*])
    };

    output.into()
}

/// Literal segments and interpolated expression sources, in order.
/// `segments.len() == sources.len() + 1`.
struct TemplatePieces {
    segments: Vec<String>,
    sources: Vec<String>,
}

fn split_template(text: &str) -> Result<TemplatePieces, String> {
    let mut segments = Vec::new();
    let mut sources = Vec::new();
    let mut current = String::new();
    let mut rest = text;

    while let Some(pos) = rest.find('$') {
        current.push_str(&rest[..pos]);
        let after = &rest[pos..];
        if let Some(tail) = after.strip_prefix("$${") {
            current.push_str("${");
            rest = tail;
        } else if let Some(tail) = after.strip_prefix("${") {
            let end = closing_brace(tail)
                .ok_or_else(|| format!("unterminated interpolation starting at byte {pos}"))?;
            let source = tail[..end].trim();
            if source.is_empty() {
                return Err("empty interpolation `${}`".to_string());
            }
            segments.push(std::mem::take(&mut current));
            sources.push(source.to_string());
            rest = &tail[end + 1..];
        } else {
            current.push('$');
            rest = &after[1..];
        }
    }
    current.push_str(rest);
    segments.push(current);

    Ok(TemplatePieces { segments, sources })
}

/// Byte offset of the `}` closing an interpolation body. Braces inside
/// string and char literals do not count.
fn closing_brace(body: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '{' => depth += 1,
            '}' if depth == 0 => return Some(i),
            '}' => depth -= 1,
            '"' => {
                while let Some((_, c)) = chars.next() {
                    match c {
                        '\\' => {
                            chars.next();
                        }
                        '"' => break,
                        _ => {}
                    }
                }
            }
            '\'' => {
                // a char literal, as opposed to a lifetime, closes within a few chars
                let ahead: String = body[i + 1..].chars().take(3).collect();
                let len = if ahead.starts_with('\\') {
                    ahead.char_indices().skip(2).find(|&(_, c)| c == '\'').map(|(j, _)| j)
                } else {
                    ahead.char_indices().nth(1).filter(|&(_, c)| c == '\'').map(|(j, _)| j)
                };
                if let Some(len) = len {
                    let skip = ahead[..=len].chars().count();
                    for _ in 0..skip {
                        chars.next();
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// Derive a `Component` implementation from a function.
///
/// Each parameter becomes a named prop, validated by its type. The
/// generated unit struct is named after the function in PascalCase with a
/// `Component` suffix; `name` sets the declared component name, which
/// defaults to the PascalCase function name.
///
/// # Attribute syntax
///
/// ```ignore
/// #[component(name = "Greeting")]
/// ```
///
/// # Supported parameter types
/// - `Value`: accepts any value, `undefined` when missing
/// - `String`: validates the prop is a string
/// - `f64`: validates the prop is a number
/// - `bool`: validates the prop is a bool
/// - `Vec<Value>`: validates the prop is an array
/// - `Option<T>` of the above: the prop may be missing or nullish
///
/// # Example
/// ```ignore
/// #[component(name = "Greeting")]
/// fn greeting(name: String, excited: Option<bool>) -> Result<Value, EvalError> {
///     let mark = if excited.unwrap_or(false) { "!" } else { "." };
///     Ok(Value::String(format!("Hello, {name}{mark}")))
/// }
///
/// let greeting = Value::Component(ComponentRef::new(GreetingComponent));
/// ```
#[proc_macro_attribute]
pub fn component(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as ComponentArgs);
    let input_fn = parse_macro_input!(item as ItemFn);

    let fn_name = &input_fn.sig.ident;
    let pascal = to_pascal_case(&fn_name.to_string());
    let struct_name = format_ident!("{}Component", pascal);
    let component_name = args.name.unwrap_or(pascal);
    let vis = &input_fn.vis;

    let mut param_extractions = Vec::new();
    let mut param_names = Vec::new();
    let mut param_types = Vec::new();

    for arg in &input_fn.sig.inputs {
        if let FnArg::Typed(pat_type) = arg
            && let Pat::Ident(ident) = &*pat_type.pat
        {
            let param_name = &ident.ident;
            let param_name_str = param_name.to_string();
            let ty = &*pat_type.ty;

            let (extraction, rust_type) = generate_extraction(&param_name_str, ty);
            param_extractions.push(extraction);
            param_names.push(param_name.clone());
            param_types.push(rust_type);
        }
    }

    let fn_body = &input_fn.block;

    let output = quote! {
        #vis struct #struct_name;

        impl #struct_name {
            fn execute(#(#param_names: #param_types),*) -> Result<markup_lit::Value, markup_lit::EvalError> {
                #fn_body
            }
        }

        impl markup_lit::Component for #struct_name {
            fn name(&self) -> &str {
                #component_name
            }

            #[allow(unused_mut)]
            fn render(
                &self,
                mut props: markup_lit::Props,
            ) -> Result<markup_lit::Value, markup_lit::EvalError> {
                #(#param_extractions)*
                Self::execute(#(#param_names),*)
            }
        }
    };

    output.into()
}

/// Returns (extraction_code, rust_type_token)
fn generate_extraction(name: &str, ty: &Type) -> (proc_macro2::TokenStream, proc_macro2::TokenStream) {
    let ident = format_ident!("{}", name);
    let type_str = quote!(#ty).to_string().replace(' ', "");

    if let Some(inner) = type_str.strip_prefix("Option<").and_then(|s| s.strip_suffix('>')) {
        let (pattern, expected, rust_type) = match_arm(inner);
        return (
            quote! {
                let #ident = match props.shift_remove(#name) {
                    None | Some(markup_lit::Value::Undefined) | Some(markup_lit::Value::Null) => None,
                    Some(#pattern) => Some(v),
                    Some(other) => return Err(markup_lit::EvalError::type_error(
                        &format!("prop `{}` to be {}", #name, #expected),
                        other.type_name(),
                    )),
                };
            },
            quote! { Option<#rust_type> },
        );
    }

    if type_str == "Value" {
        return (
            quote! {
                let #ident = props.shift_remove(#name).unwrap_or_default();
            },
            quote! { markup_lit::Value },
        );
    }

    let (pattern, expected, rust_type) = match_arm(&type_str);
    (
        quote! {
            let #ident = match props.shift_remove(#name) {
                Some(#pattern) => v,
                Some(other) => return Err(markup_lit::EvalError::type_error(
                    &format!("prop `{}` to be {}", #name, #expected),
                    other.type_name(),
                )),
                None => return Err(markup_lit::EvalError::new(
                    markup_lit::EvalErrorKind::TypeError,
                    format!("missing required prop: {}", #name),
                )),
            };
        },
        rust_type,
    )
}

/// Pattern binding `v`, expected-type wording and Rust type for a prop type.
fn match_arm(type_str: &str) -> (proc_macro2::TokenStream, &'static str, proc_macro2::TokenStream) {
    match type_str {
        "String" => (quote! { markup_lit::Value::String(v) }, "a string", quote! { String }),
        "f64" => (quote! { markup_lit::Value::Number(v) }, "a number", quote! { f64 }),
        "bool" => (quote! { markup_lit::Value::Bool(v) }, "a bool", quote! { bool }),
        "Vec<Value>" => (
            quote! { markup_lit::Value::Array(v) },
            "an array",
            quote! { Vec<markup_lit::Value> },
        ),
        _ => (quote! { v }, "any value", quote! { markup_lit::Value }),
    }
}

fn to_pascal_case(s: &str) -> String {
    s.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => c.to_uppercase().chain(chars).collect(),
            }
        })
        .collect()
}

// -- Attribute arg parsing -----------------------------------------------

struct ComponentArgs {
    name: Option<String>,
}

impl syn::parse::Parse for ComponentArgs {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        if input.is_empty() {
            return Ok(ComponentArgs { name: None });
        }
        let ident: syn::Ident = input.parse()?;
        if ident != "name" {
            return Err(syn::Error::new(ident.span(), "expected `name`"));
        }
        input.parse::<syn::Token![=]>()?;
        let lit: syn::LitStr = input.parse()?;
        Ok(ComponentArgs { name: Some(lit.value()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_plain() {
        let pieces = split_template("<p>hi</p>").unwrap();
        assert_eq!(pieces.segments, vec!["<p>hi</p>"]);
        assert!(pieces.sources.is_empty());
    }

    #[test]
    fn test_split_interpolations() {
        let pieces = split_template("<p class=${kind}>${ items.len() }</p>").unwrap();
        assert_eq!(pieces.segments, vec!["<p class=", ">", "</p>"]);
        assert_eq!(pieces.sources, vec!["kind", "items.len()"]);
    }

    #[test]
    fn test_split_nested_braces_and_strings() {
        let pieces = split_template("<p>${ { let s = \"}\"; s } }${'}'}</p>").unwrap();
        assert_eq!(pieces.sources, vec!["{ let s = \"}\"; s }", "'}'"]);
        assert_eq!(pieces.segments, vec!["<p>", "", "</p>"]);
    }

    #[test]
    fn test_split_escape_and_lone_dollar() {
        let pieces = split_template("<p>$${x} costs $5</p>").unwrap();
        assert_eq!(pieces.segments, vec!["<p>${x} costs $5</p>"]);
    }

    #[test]
    fn test_split_errors() {
        assert!(split_template("<p>${open</p>").is_err());
        assert!(split_template("<p>${ }</p>").is_err());
    }
}
