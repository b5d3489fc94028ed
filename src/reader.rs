///! Reader for Sic.
///!
///! Turns source text into values one top-level expression at a time.
///! At each token boundary (after whitespace and `;`/`#` comment lines):
///!
///!   (        list, until the matching )
///!   'e       (quote e), built with the quote value the caller hands in
///!   "..."    string, with \a \b \f \n \t \v escapes
///!   -digit   negative number; a lone - starts an operator symbol
///!   digit    number: digits, optional . and fraction digits
///!   letter   word symbol: letters, digits and - _ ? !
///!   op char  operator symbol: a maximal run of OPERATOR_CHARS
///!
///! Anything else is an unknown token.

use crate::error::{Result, SyntaxError};
use crate::heap::Heap;
use crate::symbol::SymbolTable;
use crate::value::Val;

const WORD_PUNCTUATION: &str = "-_?!";
const OPERATOR_CHARS: &str = "-+=~!@$%^&*|\\/?<>";

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || WORD_PUNCTUATION.contains(c)
}

fn is_operator_char(c: char) -> bool {
    OPERATOR_CHARS.contains(c)
}

/// A cursor over source text. Each `read` consumes exactly one expression
/// and leaves the cursor just past it.
pub struct Reader<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(input: &'a str) -> Self {
        Reader { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some(';') | Some('#') => {
                    // comment runs through the newline
                    while let Some(c) = self.advance() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    /// Is there anything other than whitespace and comments left?
    pub fn at_end(&mut self) -> bool {
        self.skip_whitespace_and_comments();
        self.peek().is_none()
    }

    /// Read one expression. `Ok(None)` means the input is exhausted.
    ///
    /// `'e` becomes a list of `quote` itself and `e`, so the sugar does not
    /// depend on what the name `quote` is bound to where it is evaluated.
    pub fn read(
        &mut self,
        heap: &mut Heap,
        syms: &mut SymbolTable,
        quote: Val,
    ) -> Result<Option<Val>> {
        self.skip_whitespace_and_comments();
        let c = match self.peek() {
            None => return Ok(None),
            Some(c) => c,
        };

        let val = match c {
            '(' => self.read_list(heap, syms, quote)?,
            '\'' => {
                self.advance();
                let quoted = self
                    .read(heap, syms, quote)?
                    .ok_or(SyntaxError::DanglingQuote)?;
                heap.list(&[quote, quoted])
            }
            '"' => self.read_string(heap)?,
            '-' if self.peek_second().is_some_and(|c| c.is_ascii_digit()) => self.read_number(),
            c if c.is_ascii_digit() => self.read_number(),
            c if c.is_ascii_alphabetic() => self.read_symbol(syms, is_word_char),
            c if is_operator_char(c) => self.read_symbol(syms, is_operator_char),
            c => return Err(SyntaxError::UnknownToken(c).into()),
        };
        Ok(Some(val))
    }

    fn read_list(&mut self, heap: &mut Heap, syms: &mut SymbolTable, quote: Val) -> Result<Val> {
        // opening ( not yet consumed
        self.advance();
        let mut elems = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            match self.peek() {
                None => return Err(SyntaxError::UnterminatedList.into()),
                Some(')') => {
                    self.advance();
                    return Ok(heap.list(&elems));
                }
                Some(_) => {
                    let elem = self
                        .read(heap, syms, quote)?
                        .ok_or(SyntaxError::UnterminatedList)?;
                    elems.push(elem);
                }
            }
        }
    }

    fn read_string(&mut self, heap: &mut Heap) -> Result<Val> {
        self.advance();
        let mut s = String::new();
        loop {
            match self.advance() {
                None => return Err(SyntaxError::UnterminatedString.into()),
                Some('"') => return Ok(heap.alloc_string(&s)),
                Some('\\') => match self.advance() {
                    None => return Err(SyntaxError::UnterminatedString.into()),
                    Some('a') => s.push('\x07'),
                    Some('b') => s.push('\x08'),
                    Some('f') => s.push('\x0C'),
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('v') => s.push('\x0B'),
                    Some(c) => s.push(c),
                },
                Some(c) => s.push(c),
            }
        }
    }

    fn read_number(&mut self) -> Val {
        let negate = self.peek() == Some('-');
        if negate {
            self.advance();
        }

        let mut n = 0.0f64;
        while let Some(d) = self.peek().and_then(|c| c.to_digit(10)) {
            self.advance();
            n = n * 10.0 + d as f64;
        }

        if self.peek() == Some('.') {
            self.advance();
            let mut weight = 10.0f64;
            while let Some(d) = self.peek().and_then(|c| c.to_digit(10)) {
                self.advance();
                n += d as f64 / weight;
                weight *= 10.0;
            }
        }

        Val::number(if negate { -n } else { n })
    }

    fn read_symbol(&mut self, syms: &mut SymbolTable, valid: fn(char) -> bool) -> Val {
        let start = self.pos;
        while self.peek().is_some_and(valid) {
            self.advance();
        }
        syms.intern_val(&self.input[start..self.pos])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    struct Fixture {
        heap: Heap,
        syms: SymbolTable,
        quote: Val,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                heap: Heap::new(),
                syms: SymbolTable::new(),
                quote: Val::native(0),
            }
        }

        fn read_one(&mut self, src: &str) -> Result<Option<Val>> {
            Reader::new(src).read(&mut self.heap, &mut self.syms, self.quote)
        }

        fn read_ok(&mut self, src: &str) -> Val {
            self.read_one(src).unwrap().unwrap()
        }

        fn syntax_error(&mut self, src: &str) -> SyntaxError {
            match self.read_one(src).unwrap_err().kind() {
                ErrorKind::SyntaxError(e) => e.clone(),
                other => panic!("expected syntax error, got {other:?}"),
            }
        }
    }

    #[test]
    fn numbers() {
        let mut fx = Fixture::new();
        assert_eq!(fx.read_ok("42").as_number(), Some(42.0));
        assert_eq!(fx.read_ok("-7").as_number(), Some(-7.0));
        assert_eq!(fx.read_ok("2.5").as_number(), Some(2.5));
        assert_eq!(fx.read_ok("-0.25").as_number(), Some(-0.25));
        assert_eq!(fx.read_ok("3.").as_number(), Some(3.0));
    }

    #[test]
    fn symbols_word_and_operator() {
        let mut fx = Fixture::new();
        let foo = fx.read_ok("foo-bar?");
        assert_eq!(fx.syms.name(foo.as_symbol().unwrap()), "foo-bar?");
        let le = fx.read_ok("<=");
        assert_eq!(fx.syms.name(le.as_symbol().unwrap()), "<=");
        let dashes = fx.read_ok("---");
        assert_eq!(fx.syms.name(dashes.as_symbol().unwrap()), "---");
        let minus = fx.read_ok("- 1");
        assert_eq!(fx.syms.name(minus.as_symbol().unwrap()), "-");
        assert_eq!(fx.read_ok("foo"), fx.read_ok("  foo  "));
    }

    #[test]
    fn string_escapes() {
        let mut fx = Fixture::new();
        let s = fx.read_ok(r#""a\nb\tc\"d\\e\qf""#);
        assert_eq!(fx.heap.get_string(s), Some("a\nb\tc\"d\\eqf"));
        let empty = fx.read_ok(r#""""#);
        assert_eq!(fx.heap.get_string(empty), Some(""));
    }

    #[test]
    fn quote_sugar() {
        let mut fx = Fixture::new();
        let q = fx.read_ok("'(a b)");
        let items = fx.heap.list_to_vec(q).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], fx.quote);
        assert_eq!(fx.heap.list_to_vec(items[1]).unwrap().len(), 2);

        let nested = fx.read_ok("(f 'x)");
        let quoted = fx.heap.nth(nested, 1);
        assert_eq!(fx.heap.nth(quoted, 0), fx.quote);
    }

    #[test]
    fn comments_and_end_of_input() {
        let mut fx = Fixture::new();
        assert_eq!(fx.read_one("").unwrap(), None);
        assert_eq!(fx.read_one("   ; nothing\n# here\n").unwrap(), None);
        let v = fx.read_ok("; comment\n  7 ; trailing");
        assert_eq!(v.as_number(), Some(7.0));
    }

    #[test]
    fn reads_successive_expressions() {
        let mut fx = Fixture::new();
        let mut reader = Reader::new("1 (2 3) x");
        let mut count = 0;
        while let Some(_) = reader.read(&mut fx.heap, &mut fx.syms, fx.quote).unwrap() {
            count += 1;
        }
        assert_eq!(count, 3);
        assert!(reader.at_end());
    }

    #[test]
    fn syntax_errors() {
        let mut fx = Fixture::new();
        assert_eq!(fx.syntax_error("(1 2"), SyntaxError::UnterminatedList);
        assert_eq!(fx.syntax_error("(1 (2)"), SyntaxError::UnterminatedList);
        assert_eq!(fx.syntax_error("\"abc"), SyntaxError::UnterminatedString);
        assert_eq!(fx.syntax_error("\"abc\\"), SyntaxError::UnterminatedString);
        assert_eq!(fx.syntax_error("{"), SyntaxError::UnknownToken('{'));
        assert_eq!(fx.syntax_error(")"), SyntaxError::UnknownToken(')'));
        assert_eq!(fx.syntax_error("'"), SyntaxError::DanglingQuote);
    }
}
