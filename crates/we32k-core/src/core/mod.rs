mod access;
mod address;
mod hex;
pub(crate) mod macros;

pub use self::{
    access::{AccessKind, AccessWidth, ExecutionLevel},
    address::{Pa, Va},
    hex::Hex,
};
