//! # Extension Points (Hooks)
//!
//! The dispatcher calls into at most one hook of each kind, at fixed points
//! of the pipeline:
//!
//! | Hook            | Called                                       | May                    |
//! |-----------------|----------------------------------------------|------------------------|
//! | [`Interceptor`] | after the method name is resolved            | replace the request    |
//! | [`Before`]      | after arguments were decoded                 | observe                |
//! | [`Validator`]   | after `Before`, if no failure is recorded    | reject the arguments   |
//! | [`After`]       | once per negotiated request, success or not  | observe                |
//!
//! Each trait uses native `async fn` for static dispatch and has an
//! object-safe `Dyn*` twin, implemented automatically, which the server stores.
//! Plain synchronous closures implement the traits directly.
//!
//! Hooks must turn their own faults into return values; the dispatcher does
//! not catch panics.

use crate::{
    codec::Args,
    error::BoxError,
    request::{HttpRequest, RequestInfo},
};
use futures::future::BoxFuture;
use std::future::{Future, ready};

// ============================================================================
// Interceptor
// ============================================================================

/// Observes the request before lookup and may substitute it.
///
/// A returned request replaces [`RequestInfo::request`] for every later hook
/// and for the invoked method's context. The codec keeps decoding the request
/// it was bound to.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a valid Interceptor",
    label = "missing `Interceptor` implementation",
    note = "Closures must have the shape `Fn(&RequestInfo) -> Option<HttpRequest>`."
)]
pub trait Interceptor: Send + Sync + 'static {
    /// Inspect the request; return `Some` to substitute it.
    fn intercept(&self, info: &RequestInfo) -> impl Future<Output = Option<HttpRequest>> + Send;
}

/// Object-safe version of [`Interceptor`].
pub trait DynInterceptor: Send + Sync + 'static {
    /// Dynamic dispatch version of [`Interceptor::intercept`].
    fn intercept_dyn<'a>(&'a self, info: &'a RequestInfo) -> BoxFuture<'a, Option<HttpRequest>>;
}

impl<T: Interceptor> DynInterceptor for T {
    fn intercept_dyn<'a>(&'a self, info: &'a RequestInfo) -> BoxFuture<'a, Option<HttpRequest>> {
        Box::pin(self.intercept(info))
    }
}

impl<F> Interceptor for F
where
    F: Fn(&RequestInfo) -> Option<HttpRequest> + Send + Sync + 'static,
{
    fn intercept(&self, info: &RequestInfo) -> impl Future<Output = Option<HttpRequest>> + Send {
        ready((self)(info))
    }
}

// ============================================================================
// Validator
// ============================================================================

/// Checks decoded arguments before the method runs.
///
/// A returned error is recorded verbatim and the method is not invoked.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a valid Validator",
    label = "missing `Validator` implementation",
    note = "Closures must have the shape `Fn(&RequestInfo, &Args) -> Result<(), BoxError>`."
)]
pub trait Validator: Send + Sync + 'static {
    /// Accept or reject `args` for the request described by `info`.
    fn validate(
        &self,
        info: &RequestInfo,
        args: &Args,
    ) -> impl Future<Output = Result<(), BoxError>> + Send;
}

/// Object-safe version of [`Validator`].
pub trait DynValidator: Send + Sync + 'static {
    /// Dynamic dispatch version of [`Validator::validate`].
    fn validate_dyn<'a>(
        &'a self,
        info: &'a RequestInfo,
        args: &'a Args,
    ) -> BoxFuture<'a, Result<(), BoxError>>;
}

impl<T: Validator> DynValidator for T {
    fn validate_dyn<'a>(
        &'a self,
        info: &'a RequestInfo,
        args: &'a Args,
    ) -> BoxFuture<'a, Result<(), BoxError>> {
        Box::pin(self.validate(info, args))
    }
}

impl<F> Validator for F
where
    F: Fn(&RequestInfo, &Args) -> Result<(), BoxError> + Send + Sync + 'static,
{
    fn validate(
        &self,
        info: &RequestInfo,
        args: &Args,
    ) -> impl Future<Output = Result<(), BoxError>> + Send {
        ready((self)(info, args))
    }
}

// ============================================================================
// Before / After notifiers
// ============================================================================

/// Notified once the arguments have been decoded successfully.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a valid Before hook",
    label = "missing `Before` implementation",
    note = "Closures must have the shape `Fn(&RequestInfo)`."
)]
pub trait Before: Send + Sync + 'static {
    /// Observe the request before validation.
    fn before(&self, info: &RequestInfo) -> impl Future<Output = ()> + Send;
}

/// Object-safe version of [`Before`].
pub trait DynBefore: Send + Sync + 'static {
    /// Dynamic dispatch version of [`Before::before`].
    fn before_dyn<'a>(&'a self, info: &'a RequestInfo) -> BoxFuture<'a, ()>;
}

impl<T: Before> DynBefore for T {
    fn before_dyn<'a>(&'a self, info: &'a RequestInfo) -> BoxFuture<'a, ()> {
        Box::pin(self.before(info))
    }
}

impl<F> Before for F
where
    F: Fn(&RequestInfo) + Send + Sync + 'static,
{
    fn before(&self, info: &RequestInfo) -> impl Future<Output = ()> + Send {
        ready((self)(info))
    }
}

/// Notified exactly once per request that got past content negotiation.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a valid After hook",
    label = "missing `After` implementation",
    note = "Closures must have the shape `Fn(&RequestInfo)`."
)]
pub trait After: Send + Sync + 'static {
    /// Observe the final state of the request.
    fn after(&self, info: &RequestInfo) -> impl Future<Output = ()> + Send;
}

/// Object-safe version of [`After`].
pub trait DynAfter: Send + Sync + 'static {
    /// Dynamic dispatch version of [`After::after`].
    fn after_dyn<'a>(&'a self, info: &'a RequestInfo) -> BoxFuture<'a, ()>;
}

impl<T: After> DynAfter for T {
    fn after_dyn<'a>(&'a self, info: &'a RequestInfo) -> BoxFuture<'a, ()> {
        Box::pin(self.after(info))
    }
}

impl<F> After for F
where
    F: Fn(&RequestInfo) + Send + Sync + 'static,
{
    fn after(&self, info: &RequestInfo) -> impl Future<Output = ()> + Send {
        ready((self)(info))
    }
}
