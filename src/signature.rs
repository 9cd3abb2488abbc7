//! Parse a cut-out function declaration into its name, parameter names and doc.

use crate::error::{Error, Result};
use quote::ToTokens;
use syn::ext::IdentExt;
use syn::{Attribute, Expr, FnArg, Item, ItemFn, Lit, Meta, Pat};

/// One declared input parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncParam {
    name: String,
    ty: String,
}

impl FuncParam {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type as written, tokens separated by spaces.
    pub fn ty(&self) -> &str {
        &self.ty
    }
}

#[derive(Debug, Clone)]
pub struct FuncInfo {
    name: String,
    doc: String,
    params: Vec<FuncParam>,
    variadic: bool,
}

impl FuncInfo {
    /// Parse `src`, a function declaration such as
    ///
    /// ```text
    /// /// Adds two numbers.
    /// fn add(x: i64, y: i64) -> i64 { x + y }
    /// ```
    ///
    /// The first top-level `fn` item wins. Fails with
    /// [`Error::InvalidFunctionInfo`] when there is none or `src` is not valid
    /// Rust.
    pub fn parse(src: &str) -> Result<Self> {
        let file = syn::parse_file(src)
            .map_err(|e| Error::InvalidFunctionInfo(format!("{} {}", e, src)))?;
        let item = file
            .items
            .iter()
            .find_map(|item| match item {
                Item::Fn(f) => Some(f),
                _ => None,
            })
            .ok_or_else(|| Error::InvalidFunctionInfo("func decl not found".to_string()))?;
        Self::from_item(item)
    }

    fn from_item(item: &ItemFn) -> Result<Self> {
        let name = item.sig.ident.unraw().to_string();
        let params = item
            .sig
            .inputs
            .iter()
            .map(|arg| param(&name, arg))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            doc: doc_text(&item.attrs),
            params,
            variadic: item.sig.variadic.is_some(),
            name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Doc comment text without the `///` markers.
    pub fn doc(&self) -> &str {
        &self.doc
    }

    pub fn num_in(&self) -> usize {
        self.params.len()
    }

    pub fn params(&self) -> &[FuncParam] {
        &self.params
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic
    }
}

fn param(func: &str, arg: &FnArg) -> Result<FuncParam> {
    let typed = match arg {
        FnArg::Typed(typed) => typed,
        FnArg::Receiver(_) => {
            return Err(Error::InvalidFunctionInfo(format!(
                "{} takes self, methods are not supported",
                func
            )))
        }
    };
    let name = match typed.pat.as_ref() {
        Pat::Ident(ident) => ident.ident.unraw().to_string(),
        Pat::Wild(_) => "_".to_string(),
        other => {
            return Err(Error::InvalidFunctionInfo(format!(
                "{}: unsupported parameter pattern {}",
                func,
                other.to_token_stream()
            )))
        }
    };
    Ok(FuncParam {
        name,
        ty: typed.ty.to_token_stream().to_string(),
    })
}

fn doc_text(attrs: &[Attribute]) -> String {
    let mut lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(lit) => match &lit.lit {
                    Lit::Str(s) => Some(s.value()),
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        })
        .flat_map(|value| {
            value
                .lines()
                .map(|line| line.strip_prefix(' ').unwrap_or(line).to_string())
                .collect::<Vec<_>>()
        })
        .collect();
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(info: &FuncInfo) -> Vec<&str> {
        info.params().iter().map(FuncParam::name).collect()
    }

    #[test]
    fn empty_source() {
        assert!(matches!(
            FuncInfo::parse(""),
            Err(Error::InvalidFunctionInfo(_))
        ));
    }

    #[test]
    fn malformed_source() {
        assert!(matches!(
            FuncInfo::parse("fn broken(x: {"),
            Err(Error::InvalidFunctionInfo(_))
        ));
    }

    #[test]
    fn no_function() {
        let err = FuncInfo::parse("const X: i32 = 1;").unwrap_err();
        assert!(err.to_string().contains("func decl not found"));
    }

    #[test]
    fn inline_subroutine() {
        let info = FuncInfo::parse("fn subroutine() {}").unwrap();
        assert_eq!(info.name(), "subroutine");
        assert_eq!(info.num_in(), 0);
        assert_eq!(info.doc(), "");
    }

    #[test]
    fn inline_func() {
        let info = FuncInfo::parse("fn add(x: i64, y: i64) -> i64 { x + y }").unwrap();
        assert_eq!(info.name(), "add");
        assert_eq!(names(&info), ["x", "y"]);
        assert_eq!(info.params().get(1).map(FuncParam::ty), Some("i64"));
    }

    #[test]
    fn multi_line_func() {
        let src = "fn query(category: String, x: isize, y: isize, z: isize) -> String {\n    if category == \"sum\" {\n        return (x + y + z).to_string();\n    }\n    String::new()\n}";
        let info = FuncInfo::parse(src).unwrap();
        assert_eq!(info.name(), "query");
        assert_eq!(names(&info), ["category", "x", "y", "z"]);
    }

    #[test]
    fn inline_with_doc() {
        let info = FuncInfo::parse("/// Hello!\nfn hello() {}").unwrap();
        assert_eq!(info.doc(), "Hello!");
    }

    #[test]
    fn two_doc_lines() {
        let src = "/// Multiline\n/// comment\nfn multiline() {\n    println!(\"Hello\");\n}";
        let info = FuncInfo::parse(src).unwrap();
        assert_eq!(info.doc(), "Multiline\ncomment");
    }

    #[test]
    fn plain_comments_are_not_doc() {
        let info = FuncInfo::parse("// note\nfn quiet() {}").unwrap();
        assert_eq!(info.doc(), "");
    }

    #[test]
    fn doc_survives_attributes() {
        let src = "/// Runs.\n#[allow(unused)]\nfn run(_: u8, r#type: String) {}";
        let info = FuncInfo::parse(src).unwrap();
        assert_eq!(info.doc(), "Runs.");
        assert_eq!(names(&info), ["_", "type"]);
    }

    #[test]
    fn receiver_is_rejected() {
        let err = FuncInfo::parse("fn method(&self, x: i32) {}").unwrap_err();
        assert!(err.to_string().contains("methods are not supported"));
    }

    #[test]
    fn destructuring_is_rejected() {
        assert!(matches!(
            FuncInfo::parse("fn pair((a, b): (i32, i32)) {}"),
            Err(Error::InvalidFunctionInfo(_))
        ));
    }

    #[test]
    fn variadic_is_reported() {
        let info = FuncInfo::parse("unsafe extern \"C\" fn printf(format: *const u8, ...) {}").unwrap();
        assert!(info.is_variadic());
        assert_eq!(names(&info), ["format"]);
    }
}
