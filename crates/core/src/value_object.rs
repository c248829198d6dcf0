//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values; they
/// carry no identity. `Quantity { 500.00 }` equals any other `Quantity`
/// holding the same amount, while two stock entries with the same quantity
/// are still distinct rows.
///
/// The bounds keep value objects cheap to copy, comparable, and debuggable.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
