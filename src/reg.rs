//! Register value that conforms to the RAL's register API

/// A plain value with the `read()` and `write()` methods the RAL macros expect
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[repr(transparent)]
pub struct Reg<T: Copy>(T);

impl<T: Copy> Reg<T> {
    pub const fn new(val: T) -> Self {
        Reg(val)
    }

    pub const fn read(&self) -> T {
        self.0
    }

    pub fn write(&mut self, val: T) {
        self.0 = val;
    }
}
