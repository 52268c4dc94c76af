pub mod inputs;
pub mod verify;

pub use inputs::{closed_form_sum, column_sequence, filled, ones, random, random_integers};
pub use verify::{values_match, Mismatch, Reference, Report, Verifier};
