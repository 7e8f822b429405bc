//! The units a pipeline is built from.
//!
//! - [`Eval`] and [`Infer`] are leaves: a local template and an inference call.
//! - [`Sequential`], [`Loop`], [`Fork`], [`Parallel`], [`Switch`] and
//!   [`Transform`] compose other units.
//! - [`Cache`], [`Catch`] and [`Store`] decorate a single unit.
//!
//! [`Eval`]: eval::Eval
//! [`Infer`]: infer::Infer
//! [`Sequential`]: sequential::Sequential
//! [`Loop`]: looping::Loop
//! [`Fork`]: fork::Fork
//! [`Parallel`]: parallel::Parallel
//! [`Switch`]: switch::Switch
//! [`Transform`]: transform::Transform
//! [`Cache`]: cache::Cache
//! [`Catch`]: catch::Catch
//! [`Store`]: store::Store

pub mod cache;
pub mod catch;
pub mod eval;
pub mod fork;
pub mod infer;
pub mod looping;
pub mod parallel;
pub mod sequential;
pub mod store;
pub mod switch;
pub mod transform;

#[cfg(test)]
pub(crate) mod test_support;
