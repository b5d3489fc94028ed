///! Value representation for Sic.
///!
///! We use NaN-boxing: a 64-bit value that is either a plain f64 (the only
///! numeric type) or encodes one of the other variants in the unused NaN
///! payload bits.
///!
///! IEEE 754 double layout:
///!   [S][EEEEEEEEEEE][MMMM...52 bits...MMMM]
///!
///! A quiet NaN has exponent = all 1s and mantissa bit 51 = 1.
///! We set bit 50 as well ("our" NaN vs hardware NaN) leaving 50 payload bits.
///!
///! Payload layout (50 bits):
///!   [TTTT][VVVVVVVV...46 bits...VVVVVVVV]
///!
///! Tag (4 bits):
///!   0  = nil (the empty list, also "false")
///!   1  = symbol id (index into the symbol table)
///!   2  = heap index (pair, string or closure)
///!   3  = native procedure id (index into the native table)
///!
///! Nil, symbols and natives are immediates. Identity of two values is
///! word equality, which for symbols coincides with text equality because
///! the symbol table hands out one id per distinct name.

use std::fmt;

const NANISH: u64 = 0x7FFC_0000_0000_0000;

const TAG_SHIFT: u64 = 46;
const TAG_MASK: u64 = 0xF;
const PAYLOAD_MASK: u64 = (1u64 << 46) - 1;

pub const TAG_NIL: u64 = 0;
pub const TAG_SYMBOL: u64 = 1;
pub const TAG_HEAP: u64 = 2;
pub const TAG_NATIVE: u64 = 3;

/// A Sic value: 64 bits, NaN-boxed.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Val(pub u64);

impl Val {
    // ── Constructors ──

    #[inline]
    pub fn number(f: f64) -> Val {
        // Arithmetic can produce NaNs with arbitrary payloads; fold them all
        // onto the canonical hardware NaN so they never look tagged.
        if f.is_nan() {
            return Val(f64::NAN.to_bits());
        }
        Val(f.to_bits())
    }

    #[inline]
    fn tagged(tag: u64, payload: u64) -> Val {
        Val(NANISH | (tag << TAG_SHIFT) | (payload & PAYLOAD_MASK))
    }

    #[inline]
    pub fn nil() -> Val {
        Self::tagged(TAG_NIL, 0)
    }

    #[inline]
    pub fn symbol(id: u32) -> Val {
        Self::tagged(TAG_SYMBOL, id as u64)
    }

    #[inline]
    pub fn heap_ref(index: usize) -> Val {
        Self::tagged(TAG_HEAP, index as u64)
    }

    #[inline]
    pub fn native(id: u32) -> Val {
        Self::tagged(TAG_NATIVE, id as u64)
    }

    // ── Queries ──

    #[inline]
    pub fn is_nanboxed(self) -> bool {
        (self.0 & NANISH) == NANISH
    }

    #[inline]
    pub fn tag(self) -> Option<u64> {
        if self.is_nanboxed() {
            Some((self.0 >> TAG_SHIFT) & TAG_MASK)
        } else {
            None
        }
    }

    #[inline]
    pub fn payload(self) -> u64 {
        self.0 & PAYLOAD_MASK
    }

    // ── Extractors ──

    #[inline]
    pub fn as_number(self) -> Option<f64> {
        if !self.is_nanboxed() {
            Some(f64::from_bits(self.0))
        } else {
            None
        }
    }

    #[inline]
    pub fn is_nil(self) -> bool {
        self.tag() == Some(TAG_NIL)
    }

    #[inline]
    pub fn as_symbol(self) -> Option<u32> {
        if self.tag() == Some(TAG_SYMBOL) {
            Some(self.payload() as u32)
        } else {
            None
        }
    }

    #[inline]
    pub fn is_symbol(self) -> bool {
        self.tag() == Some(TAG_SYMBOL)
    }

    #[inline]
    pub fn as_heap_ref(self) -> Option<usize> {
        if self.tag() == Some(TAG_HEAP) {
            Some(self.payload() as usize)
        } else {
            None
        }
    }

    #[inline]
    pub fn as_native(self) -> Option<u32> {
        if self.tag() == Some(TAG_NATIVE) {
            Some(self.payload() as u32)
        } else {
            None
        }
    }

    /// Everything except Nil is true.
    #[inline]
    pub fn is_true(self) -> bool {
        !self.is_nil()
    }
}

impl From<f64> for Val {
    fn from(f: f64) -> Self {
        Val::number(f)
    }
}

impl fmt::Debug for Val {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(n) = self.as_number() {
            return write!(f, "Number({n})");
        }
        match self.tag() {
            Some(TAG_NIL) => write!(f, "Nil"),
            Some(TAG_SYMBOL) => write!(f, "Sym({})", self.payload()),
            Some(TAG_HEAP) => write!(f, "Heap({})", self.payload()),
            Some(TAG_NATIVE) => write!(f, "Native({})", self.payload()),
            _ => write!(f, "Unknown(0x{:016x})", self.0),
        }
    }
}
