use clap::ValueEnum;
use cryptoconditions_core::{
    Condition, Eval, EvalVerifier, RejectEvals, TypeId, VerifyOptions,
};
use serde::Serialize;

use crate::error::Result;

pub mod error;
pub mod interface;

/// Which binary form a hex argument or output is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Form {
    Condition,
    Fulfillment,
    Partial,
}

pub fn encode(tree: &Condition, form: Form) -> Result<Vec<u8>> {
    let bytes = match form {
        Form::Condition => tree.encode_condition()?,
        Form::Fulfillment => tree.encode_fulfillment()?,
        Form::Partial => tree.encode_partial_fulfillment()?,
    };
    Ok(bytes)
}

pub fn decode(bytes: &[u8], form: Form) -> Result<Condition> {
    let tree = match form {
        Form::Condition => Condition::decode_condition(bytes)?,
        Form::Fulfillment => Condition::decode_fulfillment(bytes)?,
        Form::Partial => Condition::decode_partial_fulfillment(bytes)?,
    };
    Ok(tree)
}

/// Summary printed by `cc-tool inspect`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Inspection {
    pub type_name: &'static str,
    pub uri: String,
    pub cost: u64,
    pub types: Vec<&'static str>,
    pub fulfilled: bool,
    pub evals: usize,
}

impl Inspection {
    pub fn of(tree: &Condition) -> Result<Self> {
        Ok(Self {
            type_name: tree.type_name(),
            uri: tree.uri()?,
            cost: tree.cost(),
            types: TypeId::from_mask(tree.type_mask())
                .map(|t| t.cond_type().name)
                .collect(),
            fulfilled: tree.is_fulfilled(),
            evals: tree.count_evals(),
        })
    }
}

/// Verification settings taken from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerifyFlags {
    pub accept_evals: bool,
    pub hash_message: bool,
}

/// Decodes `fulfillment` and checks it against `condition` for `message`.
pub fn verify(
    fulfillment: &[u8],
    condition: &[u8],
    message: &[u8],
    flags: VerifyFlags,
) -> Result<()> {
    let tree = Condition::decode_fulfillment(fulfillment)?;
    let accept = |_: &Eval, _: bool| true;
    let eval: &dyn EvalVerifier = if flags.accept_evals {
        &accept
    } else {
        &RejectEvals
    };
    let options = VerifyOptions {
        hash_message: flags.hash_message,
    };
    tree.verify_with(message, condition, eval, options)?;
    Ok(())
}
