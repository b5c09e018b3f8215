//! Canonical error taxonomy, grounded in `spec.md` §7.
//!
//! One error enum the outer surface maps to process exit codes, the way a
//! libc errno module maps internal failures to POSIX integers; here the
//! target vocabulary is the `PM3_*` taxonomy rather than errno.

use thiserror::Error;

/// Every fallible operation in `rfcore-core` returns one of these kinds.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Pm3Error {
    /// CLI or API argument failed validation (bad length, out-of-range nibble).
    #[error("invalid argument: {0}")]
    InvArg(String),

    /// External resource missing (JSON dictionary, nonce file).
    #[error("missing external resource: {0}")]
    EFile(String),

    /// Parse failure in an external resource.
    #[error("failed to parse external resource: {0}")]
    ESoft(String),

    /// Card returned an unexpected TLV or status.
    #[error("unexpected card exchange: {0}")]
    ECardExchange(String),

    /// Card returned a non-OK status word; the exact SW is propagated.
    #[error("card returned status word {sw:04X}")]
    EApduFail { sw: u16 },

    /// Host could not marshal an APDU. Should be unreachable; indicates a bug.
    #[error("failed to encode APDU: {0}")]
    EApduEncodeFail(String),

    /// Invariant breach (CAD full, duplicate facility, ...).
    #[error("invariant violated: {0}")]
    EFatal(String),

    /// BigBuf or heap exhausted.
    #[error("memory exhausted: {0}")]
    EMalloc(String),

    /// User or reader aborted the operation (button, field drop).
    #[error("operation aborted")]
    EOpAborted,
}

impl Pm3Error {
    /// Process exit code this error maps to, per `spec.md` §6 ("Exit codes:
    /// 0 = success; non-zero = `PM3_*` error taxonomy from §7"). The specific
    /// non-zero values are rfcore's own assignment — the original firmware's
    /// enum values are not part of the host-facing contract — but each
    /// variant maps to a distinct, stable code.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Pm3Error::InvArg(_) => 1,
            Pm3Error::EFile(_) => 2,
            Pm3Error::ESoft(_) => 3,
            Pm3Error::ECardExchange(_) => 4,
            Pm3Error::EApduFail { .. } => 5,
            Pm3Error::EApduEncodeFail(_) => 6,
            Pm3Error::EFatal(_) => 7,
            Pm3Error::EMalloc(_) => 8,
            Pm3Error::EOpAborted => 9,
        }
    }
}

impl From<Pm3Error> for i32 {
    fn from(err: Pm3Error) -> Self {
        err.exit_code()
    }
}

pub type Pm3Result<T> = Result<T, Pm3Error>;
