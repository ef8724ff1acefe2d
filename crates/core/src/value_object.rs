//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**: a `Cpf` or a
/// fixed-point measurement is defined entirely by its contents. To "modify" one,
/// construct a new value (which re-runs its validation).
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
