#![forbid(unsafe_code)]

//! Proof-obligation generation for elaborated GCL programs.

mod error;
mod options;
mod pred;
mod rename;
mod segment;
mod wp;

use gcl_core::TypedProgram;
use serde::{Deserialize, Serialize};

pub use error::StructError;
pub use options::{VerifyOptions, OBLIGATION_ID_LEN};
pub use pred::{obligation_digest, obligation_id, Origin, Pred, ProofObligation, SpecHole, StructWarning};
pub use wp::Verifier;

/// Everything generated for one program.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyOutput {
    pub obligations: Vec<ProofObligation>,
    pub specs: Vec<SpecHole>,
    pub warnings: Vec<StructWarning>,
}

pub fn verify_program(
    program: &TypedProgram,
    options: &VerifyOptions,
) -> Result<VerifyOutput, StructError> {
    let mut verifier = Verifier::new(options);
    verifier.program(program)?;
    Ok(verifier.finish())
}
