//! Persons domain module.
//!
//! This crate contains business rules for person records (CPF validation,
//! field validation, ideal weight, search/filter), implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod cpf;
pub mod measure;
pub mod person;
pub mod search;

pub use cpf::{Cpf, CpfError, check_digits, normalize_and_validate};
pub use measure::{Centi, DecimalError, DecimalInput};
pub use person::{
    HEIGHT_RANGE, NAME_MAX_LEN, Person, PersonFields, PersonInput, Sex, TextInput, WEIGHT_RANGE,
    ideal_weight,
};
pub use search::{ExactFilter, Ordering, SearchFilter};
