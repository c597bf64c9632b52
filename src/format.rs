//! Boundary to an external source parser / pretty-printer.
//!
//! Parsing and canonical printing are a black-box service behind
//! [`SourcePrinter`]. This module adds what sits on top of it: import sorting
//! before printing a complete unit, and whitespace preservation when the
//! input is only a fragment (a list of declarations or statements). The
//! engine does not depend on this module; [`FormatReducer`] lets a run format
//! many sources in parallel.

use thiserror::Error;

use crate::reducer::{ReduceError, Reducer};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("print error: {0}")]
    Print(String),
}

/// What the parser recognized.
#[derive(Debug, Clone)]
pub enum Parsed<T> {
    /// A complete compilation unit.
    Complete(T),
    /// A fragment wrapped by the parser to make it parseable.
    /// `indent_adjust` is added to the indentation passed to `print` (e.g.
    /// `-1` when statements were wrapped in a synthetic body).
    Fragment { tree: T, indent_adjust: isize },
}

/// The external parse / print service.
pub trait SourcePrinter: Send + Sync + 'static {
    type Tree: Clone;

    fn parse(&self, src: &[u8]) -> Result<Parsed<Self::Tree>, FormatError>;

    /// Render `tree` canonically, indented by `indent` levels. For fragments
    /// surrounding whitespace in the output is ignored.
    fn print(&self, tree: &Self::Tree, indent: usize) -> Result<Vec<u8>, FormatError>;

    fn has_unsorted_imports(&self, tree: &Self::Tree) -> bool;

    fn sort_imports(&self, tree: &mut Self::Tree);
}

/// Format a complete tree. Imports are sorted on a copy first if needed;
/// `tree` itself is not modified.
pub fn format_tree<P: SourcePrinter>(printer: &P, tree: &P::Tree) -> Result<Vec<u8>, FormatError> {
    if printer.has_unsorted_imports(tree) {
        let mut sorted = tree.clone();
        printer.sort_imports(&mut sorted);
        return printer.print(&sorted, 0);
    }
    printer.print(tree, 0)
}

/// Format source text.
///
/// A complete unit has its imports sorted and is printed as is. A fragment
/// keeps the caller's leading whitespace (through the last newline before the
/// first code line), is indented like its first code line, and keeps the
/// caller's trailing whitespace. Imports in fragments are not sorted.
pub fn format_text<P: SourcePrinter>(printer: &P, src: &[u8]) -> Result<Vec<u8>, FormatError> {
    match printer.parse(src)? {
        Parsed::Complete(mut tree) => {
            printer.sort_imports(&mut tree);
            printer.print(&tree, 0)
        }
        Parsed::Fragment {
            tree,
            indent_adjust,
        } => format_fragment(printer, src, &tree, indent_adjust),
    }
}

fn format_fragment<P: SourcePrinter>(
    printer: &P,
    src: &[u8],
    tree: &P::Tree,
    indent_adjust: isize,
) -> Result<Vec<u8>, FormatError> {
    // i: start of the first code line; j: first code byte.
    let (mut i, mut j) = (0, 0);
    while j < src.len() && is_space(src[j]) {
        if src[j] == b'\n' {
            i = j + 1;
        }
        j += 1;
    }

    let mut out = Vec::with_capacity(src.len());
    out.extend_from_slice(&src[..i]);

    let indent = leading_indent(&src[i..j]);
    out.extend(std::iter::repeat_n(b'\t', indent));

    let print_indent = (indent as isize + indent_adjust).max(0) as usize;
    let printed = printer.print(tree, print_indent)?;
    out.extend_from_slice(printed.trim_ascii());

    let mut k = src.len();
    while k > j && is_space(src[k - 1]) {
        k -= 1;
    }
    out.extend_from_slice(&src[k..]);

    Ok(out)
}

/// Tabs count one level each. Spaces are ignored unless there are no tabs,
/// in which case any amount of spaces counts as one level.
fn leading_indent(prefix: &[u8]) -> usize {
    let tabs = prefix.iter().filter(|&&b| b == b'\t').count();
    if tabs == 0 && prefix.contains(&b' ') {
        1
    } else {
        tabs
    }
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// Reducer that formats each item with [`format_text`]. A syntax or print
/// error becomes a fault for that item.
pub struct FormatReducer<P> {
    printer: P,
}

impl<P: SourcePrinter> FormatReducer<P> {
    pub fn new(printer: P) -> Self {
        Self { printer }
    }
}

impl<P: SourcePrinter> Reducer<String> for FormatReducer<P> {
    type Output = Vec<u8>;

    fn reduce(&self, item: String) -> Result<Option<Vec<u8>>, ReduceError> {
        format_text(&self.printer, item.as_bytes())
            .map(Some)
            .map_err(|e| ReduceError::new(e.to_string()))
    }
}
