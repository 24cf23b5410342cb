/*!
Situational assertions: zero-width position predicates.
*/

/// A zero-width boundary condition tested at a buffer position.
///
/// An assertion never consumes input. When its condition holds at the
/// region start it reports a zero-length full hit, otherwise a miss. The
/// expression and statement boundaries are declared but have no
/// implemented classification; they fail closed (never match) rather than
/// silently behaving like another discriminant.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Boundary {
    /// The position is the beginning of the buffer (offset `0`).
    Start,
    /// The position is the end of the buffer (offset `len`).
    End,
    /// The position begins a line: offset `0`, or immediately after a
    /// line terminator.
    StartLine,
    /// The position ends a line: offset `len`, or immediately before a
    /// line terminator byte.
    EndLine,
    /// The position begins a word: a word byte here, with no word byte
    /// immediately before.
    StartWord,
    /// The position ends a word: a word byte immediately before, with no
    /// word byte here.
    EndWord,
    /// The position begins a symbol, using the language's
    /// symbol-constituent classification.
    StartSymbol,
    /// The position ends a symbol.
    EndSymbol,
    /// The position begins an expression. Not implemented; never matches.
    StartExpr,
    /// The position ends an expression. Not implemented; never matches.
    EndExpr,
    /// The position begins a statement. Not implemented; never matches.
    StartStmt,
    /// The position ends a statement. Not implemented; never matches.
    EndStmt,
}

/// The language tag selecting byte classification rules for assertions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Lang {
    /// Language-neutral rules: ASCII letters form words, letters and `_`
    /// begin symbols.
    Any,
    /// C-family rules: identifiers begin with a letter or `_` and continue
    /// with letters, digits and `_`.
    C,
    /// LaTeX rules: control sequences begin with `\`.
    Latex,
}

impl Lang {
    /// Returns true if `byte` is a word constituent under this language.
    #[inline]
    pub fn is_word_byte(self, byte: u8) -> bool {
        byte.is_ascii_alphabetic()
    }

    /// Returns true if `byte` can begin a symbol under this language.
    #[inline]
    pub fn is_symbol_start_byte(self, byte: u8) -> bool {
        match self {
            Lang::Any | Lang::C => byte.is_ascii_alphabetic() || byte == b'_',
            Lang::Latex => {
                byte.is_ascii_alphabetic() || byte == b'_' || byte == b'\\'
            }
        }
    }

    /// Returns true if `byte` can continue a symbol under this language.
    #[inline]
    pub fn is_symbol_byte(self, byte: u8) -> bool {
        match self {
            Lang::Any | Lang::C => {
                byte.is_ascii_alphanumeric() || byte == b'_'
            }
            Lang::Latex => byte.is_ascii_alphabetic() || byte == b'\\',
        }
    }
}

/// The situational assertion node kind: a boundary plus the language tag
/// that selects its byte classification.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Assert {
    pub(crate) boundary: Boundary,
    pub(crate) lang: Lang,
}

impl Assert {
    /// Returns true when position `at` in `hay` satisfies this assertion.
    ///
    /// `at` may be anywhere in `0..=hay.len()`.
    pub(crate) fn matches(&self, hay: &[u8], at: usize) -> bool {
        let lang = self.lang;
        match self.boundary {
            Boundary::Start => at == 0,
            Boundary::End => at == hay.len(),
            Boundary::StartLine => is_start_line(hay, at),
            Boundary::EndLine => is_end_line(hay, at),
            Boundary::StartWord => {
                is_boundary_start(hay, at, |b| lang.is_word_byte(b))
            }
            Boundary::EndWord => {
                is_boundary_end(hay, at, |b| lang.is_word_byte(b))
            }
            Boundary::StartSymbol => {
                !symbol_at(lang, hay, at.wrapping_sub(1))
                    && at < hay.len()
                    && lang.is_symbol_start_byte(hay[at])
            }
            Boundary::EndSymbol => {
                symbol_at(lang, hay, at.wrapping_sub(1))
                    && !(at < hay.len() && lang.is_symbol_byte(hay[at]))
            }
            // Fail closed: no classification exists for these yet.
            Boundary::StartExpr
            | Boundary::EndExpr
            | Boundary::StartStmt
            | Boundary::EndStmt => false,
        }
    }
}

#[inline]
fn is_boundary_start(
    hay: &[u8],
    at: usize,
    classify: impl Fn(u8) -> bool,
) -> bool {
    let here = at < hay.len() && classify(hay[at]);
    let before = at > 0 && at <= hay.len() && classify(hay[at - 1]);
    here && !before
}

#[inline]
fn is_boundary_end(
    hay: &[u8],
    at: usize,
    classify: impl Fn(u8) -> bool,
) -> bool {
    let here = at < hay.len() && classify(hay[at]);
    let before = at > 0 && at <= hay.len() && classify(hay[at - 1]);
    before && !here
}

#[inline]
fn symbol_at(lang: Lang, hay: &[u8], at: usize) -> bool {
    at < hay.len() && lang.is_symbol_byte(hay[at])
}

/// True at offset 0, after an LF, or after a CR that does not open a CRLF
/// pair (the position between CR and LF is inside the terminator).
#[inline]
fn is_start_line(hay: &[u8], at: usize) -> bool {
    if at == 0 {
        return true;
    }
    if at > hay.len() {
        return false;
    }
    match hay[at - 1] {
        b'\n' => true,
        b'\r' => at == hay.len() || hay[at] != b'\n',
        _ => false,
    }
}

/// True at the end of the buffer or directly before a line terminator
/// byte.
#[inline]
fn is_end_line(hay: &[u8], at: usize) -> bool {
    at == hay.len() || (at < hay.len() && (hay[at] == b'\n' || hay[at] == b'\r'))
}
