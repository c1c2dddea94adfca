/// Traps raised by the gas layer.
///
/// A trap unwinds the current call frame; retry semantics are the interpreter's decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InstructionTrap {
    /// The frame cannot pay for the operation.
    #[error("out of gas")]
    OutOfGas,
    /// An operand is outside the representable or accessible range.
    #[error("value out of range")]
    OutOfRange,
    /// A state-changing operation was attempted while the frame is static.
    #[error("attempted state change in static context")]
    StaticStateChange,
    /// AUTHCALL without a prior successful AUTH.
    #[error("authcall without prior auth")]
    AuthCallUnset,
    /// AUTHCALL with a non-zero `valueExt` operand.
    #[error("authcall with non-zero valueExt")]
    AuthCallNonzeroValueExt,
}

/// Result alias for gas computations.
pub type GasResult<T> = Result<T, InstructionTrap>;
