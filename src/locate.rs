//! Find where a function is declared.
//!
//! The declared path comes from `std::any::type_name`, which names a fn item
//! by its full path (`krate::module::name`). The file is found by searching
//! the registration site first and then the files the module path maps to.

use crate::decl::SourceText;
use crate::error::{Error, Result};
use crate::handler::Handler;
use regex::Regex;
use std::any::type_name;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// `a::b::name`, optionally followed by generic arguments.
static RE_FN_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((?:(?:r#)?[A-Za-z_][A-Za-z0-9_]*::)*(?:r#)?[A-Za-z_][A-Za-z0-9_]*)(?:<.*>)?$")
        .unwrap()
});

/// Where a registration happened, captured at compile time by
/// [`source_hint!`](macro@crate::source_hint).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceHint {
    manifest_dir: &'static str,
    file: &'static str,
}

impl SourceHint {
    pub const fn new(manifest_dir: &'static str, file: &'static str) -> Self {
        Self { manifest_dir, file }
    }

    pub fn manifest_dir(&self) -> &Path {
        Path::new(self.manifest_dir)
    }

    pub fn file(&self) -> &Path {
        Path::new(self.file)
    }
}

/// Capture the calling crate's manifest directory and the current file.
#[macro_export]
macro_rules! source_hint {
    () => {
        $crate::SourceHint::new(env!("CARGO_MANIFEST_DIR"), file!())
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDescriptor {
    full_name: String,
    file: PathBuf,
    line: usize,
}

impl FunctionDescriptor {
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Last path segment: the name the function was declared with.
    pub fn name(&self) -> &str {
        last_segment(&self.full_name)
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    /// 1-based line of the declaration head.
    pub fn line(&self) -> usize {
        self.line
    }
}

impl fmt::Display for FunctionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}", self.full_name, self.file.display(), self.line)
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

/// Full declared path of `F`, or [`Error::NotAFunction`] when `F` has no
/// declaration identity (function pointers, closures, references, ...).
pub fn function_name<F: ?Sized>() -> Result<String> {
    let raw = type_name::<F>();
    RE_FN_PATH
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().replace("r#", ""))
        .ok_or_else(|| Error::NotAFunction(raw.to_string()))
}

/// Resolve `f` to its declaration and the source file holding it.
pub fn locate<F, Args>(_f: &F, hint: &SourceHint) -> Result<(FunctionDescriptor, SourceText)>
where
    F: Handler<Args>,
{
    let full_name = function_name::<F>()?;
    find_declaration(&full_name, hint)
}

fn find_declaration(full_name: &str, hint: &SourceHint) -> Result<(FunctionDescriptor, SourceText)> {
    let name = last_segment(full_name);
    let mut searched = Vec::new();
    for candidate in candidates(full_name, hint) {
        let Some(path) = resolve(hint.manifest_dir(), &candidate) else {
            searched.push(candidate);
            continue;
        };
        let source = SourceText::load(&path)?;
        if let Some(line) = source.find_fn(name) {
            let descriptor = FunctionDescriptor {
                full_name: full_name.to_string(),
                file: path,
                line,
            };
            return Ok((descriptor, source));
        }
        searched.push(path);
    }
    Err(Error::SourceNotFound {
        name: full_name.to_string(),
        searched,
    })
}

/// Files that may declare `full_name`, most likely first, without duplicates.
fn candidates(full_name: &str, hint: &SourceHint) -> Vec<PathBuf> {
    let segments: Vec<&str> = full_name.split("::").collect();
    let modules = match segments.len() {
        0..=2 => &[][..],
        n => &segments[1..n - 1],
    };
    let mut out = vec![hint.file().to_path_buf()];
    for depth in (1..=modules.len()).rev() {
        let dir: PathBuf = std::iter::once("src").chain(modules[..depth].iter().copied()).collect();
        out.push(dir.with_extension("rs"));
        out.push(dir.join("mod.rs"));
    }
    out.push(PathBuf::from("src/lib.rs"));
    out.push(PathBuf::from("src/main.rs"));
    let mut seen = Vec::with_capacity(out.len());
    out.retain(|p| {
        if seen.contains(p) {
            return false;
        }
        seen.push(p.clone());
        true
    });
    out
}

/// Absolute paths as they are; relative ones against `base` and its ancestors.
fn resolve(base: &Path, candidate: &Path) -> Option<PathBuf> {
    if candidate.is_absolute() {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    base.ancestors()
        .map(|dir| dir.join(candidate))
        .find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn add(x: i64) -> i64 {
        x + 1
    }

    fn name_of<F: 'static>(_: &F) -> Result<String> {
        function_name::<F>()
    }

    #[test]
    fn fn_item_name() {
        assert_eq!(name_of(&add).unwrap(), "fncli::locate::tests::add");
    }

    #[test]
    fn not_functions() {
        let pointer = add as fn(i64) -> i64;
        assert!(matches!(name_of(&pointer), Err(Error::NotAFunction(_))));
        let closure = |x: i64| x;
        assert!(matches!(name_of(&closure), Err(Error::NotAFunction(_))));
        assert!(matches!(
            function_name::<&str>(),
            Err(Error::NotAFunction(_))
        ));
    }

    #[test]
    fn generic_arguments_are_dropped() {
        assert_eq!(
            function_name::<Vec<u8>>().unwrap(),
            "alloc::vec::Vec"
        );
    }

    #[test]
    fn locate_in_this_file() {
        let (descriptor, source) = locate(&add, &crate::source_hint!()).unwrap();
        assert_eq!(descriptor.name(), "add");
        assert!(descriptor.file().ends_with("src/locate.rs"));
        let head = source.line(descriptor.line()).unwrap();
        assert_eq!(head.trim(), "fn add(x: i64) -> i64 {");
    }

    #[test]
    fn candidate_order() {
        let hint = SourceHint::new("/nowhere", "src/bin/tool.rs");
        let got = candidates("krate::a::b::run", &hint);
        let want: Vec<PathBuf> = [
            "src/bin/tool.rs",
            "src/a/b.rs",
            "src/a/b/mod.rs",
            "src/a.rs",
            "src/a/mod.rs",
            "src/lib.rs",
            "src/main.rs",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();
        assert_eq!(got, want);
    }

    #[test]
    fn module_file_is_searched() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/math")).unwrap();
        fs::write(dir.path().join("src/lib.rs"), "pub mod math;\n").unwrap();
        fs::write(
            dir.path().join("src/math/mod.rs"),
            "use std::fmt;\n\n/// Adds.\npub fn add(x: i64, y: i64) -> i64 {\n    x + y\n}\n",
        )
        .unwrap();
        let manifest: &'static str = Box::leak(dir.path().display().to_string().into_boxed_str());
        let hint = SourceHint::new(manifest, "src/main.rs");
        let (descriptor, _) = find_declaration("krate::math::add", &hint).unwrap();
        assert_eq!(descriptor.file(), dir.path().join("src/math/mod.rs"));
        assert_eq!(descriptor.line(), 4);
        assert_eq!(descriptor.full_name(), "krate::math::add");
    }

    #[test]
    fn workspace_relative_file() {
        let dir = tempfile::tempdir().unwrap();
        let member = dir.path().join("tools/cmd");
        fs::create_dir_all(&member).unwrap();
        fs::write(dir.path().join("tools/cmd/run.rs"), "fn go() {}\n").unwrap();
        let manifest: &'static str = Box::leak(member.display().to_string().into_boxed_str());
        let hint = SourceHint::new(manifest, "tools/cmd/run.rs");
        let (descriptor, _) = find_declaration("cmd::go", &hint).unwrap();
        assert_eq!(descriptor.line(), 1);
    }

    #[test]
    fn not_found_lists_searched_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/lib.rs"), "fn other() {}\n").unwrap();
        let manifest: &'static str = Box::leak(dir.path().display().to_string().into_boxed_str());
        let hint = SourceHint::new(manifest, "src/lib.rs");
        let err = find_declaration("krate::missing", &hint).unwrap_err();
        match err {
            Error::SourceNotFound { name, searched } => {
                assert_eq!(name, "krate::missing");
                assert!(!searched.is_empty());
            }
            other => panic!("unexpected {}", other),
        }
    }
}
