//! Opening modes

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Base {
    Read,
    Write,
    Append,
    Exclusive,
}

/// How a file is opened: `r`, `w`, `a` or `x`, optionally followed by `+`.
///
/// | mode | read | write | truncate | cursor | creates | must exist |
/// |------|------|-------|----------|--------|---------|------------|
/// | `r`  | yes  | no    | no       | 0      | no      | yes        |
/// | `w`  | no   | yes   | yes      | 0      | yes     | no         |
/// | `a`  | no   | yes   | no       | end    | yes     | no         |
/// | `x`  | no   | yes   | yes      | 0      | yes, must not exist | no |
///
/// `+` adds the missing capability. A `b` or `t` flag is accepted and
/// ignored; content is always bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpenMode {
    base: Base,
    plus: bool,
}

impl OpenMode {
    pub const READ: OpenMode = OpenMode::new(Base::Read, false);
    pub const WRITE: OpenMode = OpenMode::new(Base::Write, false);
    pub const APPEND: OpenMode = OpenMode::new(Base::Append, false);
    pub const CREATE_NEW: OpenMode = OpenMode::new(Base::Exclusive, false);
    pub const READ_WRITE: OpenMode = OpenMode::new(Base::Read, true);
    pub const WRITE_READ: OpenMode = OpenMode::new(Base::Write, true);
    pub const APPEND_READ: OpenMode = OpenMode::new(Base::Append, true);
    pub const CREATE_NEW_READ: OpenMode = OpenMode::new(Base::Exclusive, true);

    const fn new(base: Base, plus: bool) -> Self {
        Self { base, plus }
    }

    /// Parse a mode string such as `"r"`, `"w+"` or `"rb"`.
    pub fn parse(mode: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::invalid_argument(format!("mode '{mode}': {reason}"));

        let mut base = None;
        let mut plus = false;
        let mut flag = false;
        for c in mode.chars() {
            match c {
                'r' | 'w' | 'a' | 'x' => {
                    if base.is_some() {
                        return Err(invalid("more than one of r, w, a, x"));
                    }
                    base = Some(match c {
                        'r' => Base::Read,
                        'w' => Base::Write,
                        'a' => Base::Append,
                        _ => Base::Exclusive,
                    });
                }
                '+' if plus => return Err(invalid("repeated '+'")),
                '+' => plus = true,
                'b' | 't' if flag => return Err(invalid("repeated 'b'/'t'")),
                'b' | 't' => flag = true,
                other => return Err(invalid(&format!("unknown character '{other}'"))),
            }
        }

        base.map(|base| Self { base, plus })
            .ok_or_else(|| invalid("must contain one of r, w, a, x"))
    }

    pub fn readable(&self) -> bool {
        self.base == Base::Read || self.plus
    }

    pub fn writable(&self) -> bool {
        self.base != Base::Read || self.plus
    }

    /// Writes always land at the end of content.
    pub fn append(&self) -> bool {
        self.base == Base::Append
    }

    /// Content is emptied when the file is opened.
    pub fn truncate(&self) -> bool {
        matches!(self.base, Base::Write | Base::Exclusive)
    }

    /// A missing file is created.
    pub fn create(&self) -> bool {
        self.base != Base::Read
    }

    /// Opening fails if the file already exists.
    pub fn exclusive(&self) -> bool {
        self.base == Base::Exclusive
    }

    /// Opening fails if the file does not exist.
    pub fn must_exist(&self) -> bool {
        self.base == Base::Read
    }
}

impl Default for OpenMode {
    fn default() -> Self {
        Self::READ
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = match self.base {
            Base::Read => "r",
            Base::Write => "w",
            Base::Append => "a",
            Base::Exclusive => "x",
        };
        write!(f, "{}{}", base, if self.plus { "+" } else { "" })
    }
}

impl FromStr for OpenMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for OpenMode {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("r", true, false, false, false, false)]
    #[case("w", false, true, true, true, false)]
    #[case("a", false, true, false, true, true)]
    #[case("x", false, true, true, true, false)]
    #[case("r+", true, true, false, false, false)]
    #[case("w+", true, true, true, true, false)]
    #[case("a+", true, true, false, true, true)]
    #[case("x+", true, true, true, true, false)]
    fn capability_table(
        #[case] mode: &str,
        #[case] readable: bool,
        #[case] writable: bool,
        #[case] truncate: bool,
        #[case] create: bool,
        #[case] append: bool,
    ) {
        let parsed = OpenMode::parse(mode).unwrap();
        assert_eq!(parsed.readable(), readable, "readable for {mode}");
        assert_eq!(parsed.writable(), writable, "writable for {mode}");
        assert_eq!(parsed.truncate(), truncate, "truncate for {mode}");
        assert_eq!(parsed.create(), create, "create for {mode}");
        assert_eq!(parsed.append(), append, "append for {mode}");
        assert_eq!(parsed.to_string(), mode);
    }

    #[rstest]
    #[case("rb", "r")]
    #[case("wb+", "w+")]
    #[case("r+b", "r+")]
    #[case("at", "a")]
    fn binary_and_text_flags_are_ignored(#[case] mode: &str, #[case] canonical: &str) {
        assert_eq!(OpenMode::parse(mode).unwrap().to_string(), canonical);
    }

    #[rstest]
    #[case("")]
    #[case("+")]
    #[case("b")]
    #[case("rw")]
    #[case("r++")]
    #[case("rbt")]
    #[case("q")]
    #[case("R")]
    fn rejects_malformed_modes(#[case] mode: &str) {
        assert!(matches!(
            OpenMode::parse(mode),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn only_exclusive_refuses_existing() {
        assert!(OpenMode::CREATE_NEW.exclusive());
        assert!(!OpenMode::WRITE.exclusive());
        assert!(OpenMode::READ.must_exist());
        assert!(OpenMode::READ_WRITE.must_exist());
    }
}
