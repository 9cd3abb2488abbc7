//! Cut a single function declaration out of a source file.
//!
//! No full parse happens here: the head line is recognized with a regex, the
//! body is found by a textual brace balance, and the doc block is the run of
//! comment/attribute lines right above the head. Braces inside string
//! literals or comments of the signature are not expected.

use crate::error::{Error, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// `[pub[(..)]] [const|async|unsafe]* [extern ["abi"]] fn name`
static RE_FN_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s*(?:pub(?:\s*\([^)]*\))?\s+)?(?:(?:const|async|unsafe)\s+)*(?:extern\s+(?:"[^"]*"\s+)?)?fn\s+(?:r#)?([A-Za-z_][A-Za-z0-9_]*)"#,
    )
    .unwrap()
});

/// Lines kept above a declaration head: `//`, `///` and one-line `#[...]`.
static RE_DOC_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?://|#\[)").unwrap());

/// Name declared by `line` if it opens a function declaration.
pub fn fn_head_name(line: &str) -> Option<&str> {
    RE_FN_HEAD
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

// ── Source text ──────────────────────────────────────────────────

/// The lines of one source file, read once.
#[derive(Debug, Clone)]
pub struct SourceText {
    path: PathBuf,
    lines: Vec<String>,
}

impl SourceText {
    pub fn new(path: impl Into<PathBuf>, text: &str) -> Self {
        Self {
            path: path.into(),
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(path, &text))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Line by 1-based number.
    pub fn line(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|idx| self.lines.get(idx))
            .map(String::as_str)
    }

    /// 1-based number of the first line declaring `fn name`.
    pub fn find_fn(&self, name: &str) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| fn_head_name(line) == Some(name))
            .map(|idx| idx + 1)
    }
}

// ── Declaration cutter ───────────────────────────────────────────

pub struct DeclCutter<'a> {
    source: &'a SourceText,
    line: usize,
}

impl<'a> DeclCutter<'a> {
    /// `line` is the 1-based number of the declaration head.
    pub fn new(source: &'a SourceText, line: usize) -> Self {
        Self { source, line }
    }

    /// Doc block plus signature plus body, joined with newlines.
    pub fn cut(&self) -> Result<String> {
        if self.head().is_none() {
            return Err(self.fail("no func decl head"));
        }
        let body = self.body().ok_or_else(|| self.fail("cannot find body"))?;
        let mut lines = self.doc();
        lines.extend(body);
        Ok(lines.join("\n"))
    }

    fn fail(&self, reason: &str) -> Error {
        Error::CannotCutDeclaration {
            file: self.source.path().to_path_buf(),
            line: self.line,
            reason: reason.to_string(),
        }
    }

    fn head(&self) -> Option<&'a str> {
        self.source
            .line(self.line)
            .filter(|line| fn_head_name(line).is_some())
    }

    fn body(&self) -> Option<Vec<&'a str>> {
        let mut opens = 0;
        let mut closes = 0;
        let mut lines = Vec::new();
        let mut idx = self.line;
        loop {
            let line = self.source.line(idx)?;
            opens += line.matches('{').count();
            closes += line.matches('}').count();
            lines.push(line);
            if opens > 0 && closes > 0 && opens == closes {
                return Some(lines);
            }
            idx += 1;
        }
    }

    fn doc(&self) -> Vec<&'a str> {
        let mut start = self.line;
        while let Some(prev) = start.checked_sub(1).and_then(|n| self.source.line(n)) {
            if !RE_DOC_LINE.is_match(prev) {
                break;
            }
            start -= 1;
        }
        (start..self.line)
            .filter_map(|n| self.source.line(n))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cut(file: &str, line: usize) -> Result<String> {
        let source = SourceText::new("test.rs", file);
        DeclCutter::new(&source, line).cut()
    }

    #[test]
    fn not_a_function() {
        let err = cut("mod tmp;\nconst X: i32 = 1;", 2).unwrap_err();
        assert!(matches!(err, Error::CannotCutDeclaration { line: 2, .. }));
    }

    #[test]
    fn line_out_of_range() {
        assert!(matches!(
            cut("fn f() {}", 5),
            Err(Error::CannotCutDeclaration { .. })
        ));
        assert!(matches!(
            cut("fn f() {}", 0),
            Err(Error::CannotCutDeclaration { .. })
        ));
    }

    #[test]
    fn incomplete_function() {
        let err = cut("mod tmp;\nfn f() {\n", 2).unwrap_err();
        assert!(err.to_string().contains("cannot find body"));
    }

    #[test]
    fn inline() {
        assert_eq!(cut("mod tmp;\nfn f() {}", 2).unwrap(), "fn f() {}");
    }

    #[test]
    fn multi_line_stops_at_balance() {
        let file = "mod tmp;\nfn f(name: String) {\n    println!(\"{}\", name);\n}\nfn g() {}";
        assert_eq!(
            cut(file, 2).unwrap(),
            "fn f(name: String) {\n    println!(\"{}\", name);\n}"
        );
    }

    #[test]
    fn inline_with_doc() {
        let file = "mod tmp;\n/// A\n/// B\nfn with_doc() {}\n";
        assert_eq!(cut(file, 4).unwrap(), "/// A\n/// B\nfn with_doc() {}");
    }

    #[test]
    fn doc_with_blank_comment_and_attribute() {
        let file = "use x;\n/// A\n///\n/// B\n#[allow(dead_code)]\npub fn with_doc(name: &str) -> i32 {\n    0\n}\n";
        assert_eq!(
            cut(file, 6).unwrap(),
            "/// A\n///\n/// B\n#[allow(dead_code)]\npub fn with_doc(name: &str) -> i32 {\n    0\n}"
        );
    }

    #[test]
    fn indented_function_in_module() {
        let file = "mod inner {\n    /// Doc.\n    fn nested(x: i32) {\n        let _ = x;\n    }\n}\n";
        assert_eq!(
            cut(file, 3).unwrap(),
            "    /// Doc.\n    fn nested(x: i32) {\n        let _ = x;\n    }"
        );
    }

    #[test]
    fn head_names() {
        assert_eq!(fn_head_name("fn plain() {}"), Some("plain"));
        assert_eq!(fn_head_name("pub(crate) async fn run(x: u8)"), Some("run"));
        assert_eq!(
            fn_head_name("pub unsafe extern \"C\" fn ffi(x: i32, ...) {}"),
            Some("ffi")
        );
        assert_eq!(fn_head_name("fn r#type() {}"), Some("type"));
        assert_eq!(fn_head_name("/// fn doc() {}"), None);
        assert_eq!(fn_head_name("let f = |x| x;"), None);
    }

    #[test]
    fn find_first_declaration() {
        let source = SourceText::new("x.rs", "use a;\n\nfn a() {}\nfn b() {}\nfn a() {}");
        assert_eq!(source.find_fn("a"), Some(3));
        assert_eq!(source.find_fn("b"), Some(4));
        assert_eq!(source.find_fn("c"), None);
    }
}
