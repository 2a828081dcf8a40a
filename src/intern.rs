//! String interning for the binary decoders.
//!
//! A graph file mentions the same filenames and function names over and over; the decoders
//! intern every string and the model builders key their maps by [`Symbol`], so comparisons and
//! hashing work on integers. The [`Interner`] resolves a symbol back into its string when the
//! record emitter needs the actual name.
//!
//! [`Symbol`]: ./struct.Symbol.html
//! [`Interner`]: ./struct.Interner.html

use num_traits::{Bounded, FromPrimitive, ToPrimitive};
use shawshank::{self, ArenaSet};

use std::fmt;
use std::ops::Index;

/// An interned string.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Symbol(usize);

impl fmt::Debug for Symbol {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "Symbol({})", self.0)
    }
}

impl Bounded for Symbol {
    fn min_value() -> Self {
        Symbol(usize::min_value())
    }
    fn max_value() -> Self {
        Symbol(usize::max_value())
    }
}

impl FromPrimitive for Symbol {
    fn from_i64(n: i64) -> Option<Self> {
        usize::from_i64(n).map(Symbol)
    }
    fn from_u64(n: u64) -> Option<Self> {
        usize::from_u64(n).map(Symbol)
    }
    fn from_usize(n: usize) -> Option<Self> {
        Some(Symbol(n))
    }
}

impl ToPrimitive for Symbol {
    fn to_i64(&self) -> Option<i64> {
        self.0.to_i64()
    }
    fn to_u64(&self) -> Option<u64> {
        self.0.to_u64()
    }
    fn to_usize(&self) -> Option<usize> {
        Some(self.0)
    }
}

impl From<usize> for Symbol {
    fn from(v: usize) -> Symbol {
        Symbol(v)
    }
}
impl From<Symbol> for usize {
    fn from(s: Symbol) -> usize {
        s.0
    }
}

/// The symbol representing the string `"<unknown>"`.
pub const UNKNOWN_SYMBOL: Symbol = Symbol(0);

/// The string interner.
pub struct Interner(ArenaSet<Box<str>, Symbol>);

impl Interner {
    /// Creates a new interner, pre-seeded with [`UNKNOWN_SYMBOL`].
    ///
    /// [`UNKNOWN_SYMBOL`]: ./constant.UNKNOWN_SYMBOL.html
    pub fn new() -> Interner {
        let mut si = shawshank::Builder::<Box<str>, Symbol>::new().hash().unwrap();
        let symbol = si.intern("<unknown>").unwrap();
        debug_assert_eq!(symbol, UNKNOWN_SYMBOL);
        Interner(si)
    }

    /// Interns a string.
    pub fn intern<S: Into<Box<str>>>(&mut self, s: S) -> Symbol {
        self.0.intern(s.into()).unwrap()
    }
}

impl Default for Interner {
    fn default() -> Interner {
        Interner::new()
    }
}

impl Index<Symbol> for Interner {
    type Output = str;
    fn index(&self, index: Symbol) -> &str {
        self.0.resolve(index).expect("valid symbol")
    }
}
