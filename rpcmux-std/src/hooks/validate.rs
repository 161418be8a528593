use rpcmux_core::{Args, BoxError, RequestInfo, Validator};
use std::marker::PhantomData;

/// A validator for one concrete argument type.
///
/// Requests whose arguments are of another type pass untouched, so a single
/// server-wide validator can target the methods it knows about.
///
/// ```rust,ignore
/// let validator = TypedValidator::new(|_info, req: &Service1Request| {
///     if req.a < 0 { Err("a must be non-negative".into()) } else { Ok(()) }
/// });
/// ```
pub struct TypedValidator<A, F> {
    check: F,
    _marker: PhantomData<fn(&A)>,
}

impl<A, F> TypedValidator<A, F>
where
    A: 'static,
    F: Fn(&RequestInfo, &A) -> Result<(), BoxError>,
{
    /// Wrap a check over arguments of type `A`.
    pub fn new(check: F) -> Self {
        Self {
            check,
            _marker: PhantomData,
        }
    }
}

impl<A, F> Validator for TypedValidator<A, F>
where
    A: Send + Sync + 'static,
    F: Fn(&RequestInfo, &A) -> Result<(), BoxError> + Send + Sync + 'static,
{
    async fn validate(&self, info: &RequestInfo, args: &Args) -> Result<(), BoxError> {
        match args.downcast_ref::<A>() {
            Some(args) => (self.check)(info, args),
            None => Ok(()),
        }
    }
}
