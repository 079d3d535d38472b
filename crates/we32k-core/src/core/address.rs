use super::macros::impl_ops;

impl_ops!(Pa, u32, "Physical Address");
impl_ops!(Va, u32, "Virtual Address");

impl Pa {
    /// Returns the address of the aligned word containing this address.
    pub const fn word_aligned(self) -> Self {
        Self(self.0 & !3)
    }
}

impl From<Va> for Pa {
    /// Identity mapping, used while the MMU is disabled.
    fn from(value: Va) -> Self {
        Self(value.0)
    }
}
