//! Opaque ids that tag trace output.
//!
//! 同じ ULID 表現でも、ハンドル用と集約用で別の型にしてある。

use std::fmt;

use ulid::Ulid;

macro_rules! trace_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(Ulid);

        impl $name {
            pub(crate) fn generate() -> Self {
                Self(Ulid::new())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(self, f)
            }
        }
    };
}

trace_id!(
    /// One `FutureHandle`, submitted or derived.
    HandleId,
    "handle-"
);

trace_id!(
    /// One `Aggregator::aggregate` call.
    AggregationId,
    "agg-"
);
