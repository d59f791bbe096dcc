#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![deny(missing_debug_implementations, nonstandard_style)]
#![warn(missing_docs, future_incompatible, unreachable_pub, rust_2018_idioms)]

mod builder;
mod chained;
mod context;
mod date_math;
mod include;
mod resolver;
mod validation;
mod visitor;

pub use crate::builder::{to_query_string, QueryStringBuilder};
pub use crate::chained::ChainedVisitor;
pub use crate::context::{
    CancellationToken, FieldResolver, IncludeResolver, ResolverError, SkipInclude, VisitorContext,
};
pub use crate::date_math::{DateMathError, DateMathEvaluator, DateMathVisitor, Rounding};
pub use crate::include::{IncludeVisitor, MAX_INCLUDE_DEPTH};
pub use crate::resolver::{FieldMap, FieldResolverVisitor};
pub use crate::validation::{
    ValidationError, ValidationOptions, ValidationResult, ValidationVisitor,
};
pub use crate::visitor::{walk, VisitError, Visitor};
