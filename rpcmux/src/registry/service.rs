//! Registry of services and their exposed methods.

use futures::future::BoxFuture;
use http::HeaderMap;
use rpcmux_core::{
    Args, BoxError, Context, Method, MethodShape, RegistrationError, Reply, RpcError, Service,
};
use std::{collections::HashMap, fmt, sync::Arc};

/// An exposed method bound to its service's receiver.
#[derive(Clone)]
pub struct MethodSpec {
    qualified: String,
    name: String,
    shape: MethodShape,
    arg_type: &'static str,
    reply_type: &'static str,
    bound: Arc<dyn BoundMethod>,
}

impl MethodSpec {
    /// `Service.Method` key the method is dispatched under.
    pub fn qualified_name(&self) -> &str {
        &self.qualified
    }

    /// Method name, without the service prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Which of the two accepted shapes the method has.
    pub fn shape(&self) -> MethodShape {
        self.shape
    }

    /// Rust type name of the argument type.
    pub fn arg_type(&self) -> &'static str {
        self.arg_type
    }

    /// Rust type name of the reply type.
    pub fn reply_type(&self) -> &'static str {
        self.reply_type
    }

    /// A zero-valued argument for one request.
    pub fn new_args(&self) -> Box<Args> {
        self.bound.new_args()
    }

    /// A zero-valued reply for one request.
    pub fn new_reply(&self) -> Box<Reply> {
        self.bound.new_reply()
    }

    /// Invoke the method on its receiver.
    pub fn invoke<'a>(
        &'a self,
        ctx: &'a Context<'a>,
        args: &'a Args,
        reply: &'a mut Reply,
        headers: &'a mut HeaderMap,
    ) -> BoxFuture<'a, Result<(), BoxError>> {
        self.bound.invoke(ctx, args, reply, headers)
    }
}

impl fmt::Debug for MethodSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodSpec")
            .field("qualified", &self.qualified)
            .field("shape", &self.shape)
            .field("arg_type", &self.arg_type)
            .field("reply_type", &self.reply_type)
            .finish()
    }
}

trait BoundMethod: Send + Sync {
    fn new_args(&self) -> Box<Args>;
    fn new_reply(&self) -> Box<Reply>;
    fn invoke<'a>(
        &'a self,
        ctx: &'a Context<'a>,
        args: &'a Args,
        reply: &'a mut Reply,
        headers: &'a mut HeaderMap,
    ) -> BoxFuture<'a, Result<(), BoxError>>;
}

struct Bound<S> {
    receiver: Arc<S>,
    method: Method<S>,
}

impl<S: Service> BoundMethod for Bound<S> {
    fn new_args(&self) -> Box<Args> {
        self.method.new_args()
    }

    fn new_reply(&self) -> Box<Reply> {
        self.method.new_reply()
    }

    fn invoke<'a>(
        &'a self,
        ctx: &'a Context<'a>,
        args: &'a Args,
        reply: &'a mut Reply,
        headers: &'a mut HeaderMap,
    ) -> BoxFuture<'a, Result<(), BoxError>> {
        self.method
            .invoke(&self.receiver, ctx, args, reply, headers)
    }
}

#[derive(Debug)]
struct ServiceEntry {
    methods: HashMap<String, MethodSpec>,
}

/// The table of registered services.
///
/// Populated at setup time and read-only once requests are served.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: HashMap<String, ServiceEntry>,
}

impl ServiceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `receiver` under `name`, or under its type name if `name` is empty.
    ///
    /// Fails if the name is taken or invalid, if the method table repeats a
    /// name, or if no method has a suitable shape. Method names that are empty
    /// or contain `.` can never be dispatched to and are skipped.
    pub fn register<S: Service>(
        &mut self,
        receiver: Arc<S>,
        name: &str,
    ) -> Result<(), RegistrationError> {
        let name = if name.is_empty() { S::type_name() } else { name };
        if name.is_empty() || name.contains('.') {
            return Err(RegistrationError::InvalidName(name.to_owned()));
        }
        if self.services.contains_key(name) {
            return Err(RegistrationError::AlreadyDefined(name.to_owned()));
        }

        let mut methods = HashMap::new();
        for method in S::methods() {
            if method.name().is_empty() || method.name().contains('.') {
                continue;
            }
            if methods.contains_key(method.name()) {
                return Err(RegistrationError::DuplicateMethod {
                    service: name.to_owned(),
                    method: method.name().to_owned(),
                });
            }
            let spec = MethodSpec {
                qualified: format!("{name}.{}", method.name()),
                name: method.name().to_owned(),
                shape: method.shape(),
                arg_type: method.arg_type(),
                reply_type: method.reply_type(),
                bound: Arc::new(Bound {
                    receiver: Arc::clone(&receiver),
                    method,
                }),
            };
            methods.insert(spec.name.clone(), spec);
        }

        if methods.is_empty() {
            return Err(RegistrationError::NoSuitableMethods(name.to_owned()));
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(service = %name, methods = methods.len(), "registered rpc service");

        self.services
            .insert(name.to_owned(), ServiceEntry { methods });
        Ok(())
    }

    /// Find the method dispatched under `qualified` (`Service.Method`).
    pub fn lookup(&self, qualified: &str) -> Result<&MethodSpec, RpcError> {
        let (service, method) = qualified
            .split_once('.')
            .filter(|(_, method)| !method.contains('.'))
            .ok_or_else(|| RpcError::IllFormedMethod(qualified.to_owned()))?;
        self.services
            .get(service)
            .and_then(|entry| entry.methods.get(method))
            .ok_or_else(|| RpcError::MethodNotFound(qualified.to_owned()))
    }

    /// Whether `qualified` names a registered method.
    pub fn has_method(&self, qualified: &str) -> bool {
        self.lookup(qualified).is_ok()
    }

    /// Names of the registered services, in no particular order.
    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    /// Exposed methods of `service`, in no particular order.
    pub fn methods(&self, service: &str) -> impl Iterator<Item = &MethodSpec> {
        self.services
            .get(service)
            .into_iter()
            .flat_map(|entry| entry.methods.values())
    }

    /// Number of registered services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Whether no service is registered.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::future;

    #[derive(Default)]
    struct Count(u32);

    struct Counter;

    fn bump<'a>(
        _: &'a Counter,
        _: &'a Context<'a>,
        args: &'a Count,
        reply: &'a mut Count,
    ) -> BoxFuture<'a, Result<(), BoxError>> {
        reply.0 = args.0 + 1;
        Box::pin(future::ready(Ok(())))
    }

    impl Service for Counter {
        fn methods() -> Vec<Method<Self>> {
            vec![
                Method::new("Bump", bump),
                Method::new("", bump),
                Method::new("Dotted.Name", bump),
            ]
        }
    }

    struct Twice;

    impl Service for Twice {
        fn methods() -> Vec<Method<Self>> {
            fn noop<'a>(
                _: &'a Twice,
                _: &'a Context<'a>,
                _: &'a Count,
                _: &'a mut Count,
            ) -> BoxFuture<'a, Result<(), BoxError>> {
                Box::pin(future::ready(Ok(())))
            }
            vec![Method::new("Same", noop), Method::new("Same", noop)]
        }
    }

    struct Empty;

    impl Service for Empty {
        fn methods() -> Vec<Method<Self>> {
            Vec::new()
        }
    }

    #[test]
    fn inferred_and_explicit_names() {
        let mut registry = ServiceRegistry::new();
        let counter = Arc::new(Counter);
        registry.register(Arc::clone(&counter), "").unwrap();
        registry.register(counter, "Other").unwrap();

        assert!(registry.has_method("Counter.Bump"));
        assert!(registry.has_method("Other.Bump"));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.methods("Counter").count(), 1);
    }

    #[test]
    fn undispatchable_method_names_are_skipped() {
        let mut registry = ServiceRegistry::new();
        registry.register(Arc::new(Counter), "").unwrap();

        assert!(!registry.has_method("Counter."));
        assert!(!registry.has_method("Counter.Dotted.Name"));
    }

    #[test]
    fn registration_errors() {
        let mut registry = ServiceRegistry::new();
        registry.register(Arc::new(Counter), "").unwrap();

        assert_eq!(
            registry.register(Arc::new(Counter), ""),
            Err(RegistrationError::AlreadyDefined("Counter".into()))
        );
        assert_eq!(
            registry.register(Arc::new(Counter), "a.b"),
            Err(RegistrationError::InvalidName("a.b".into()))
        );
        assert_eq!(
            registry.register(Arc::new(Empty), ""),
            Err(RegistrationError::NoSuitableMethods("Empty".into()))
        );
        assert_eq!(
            registry.register(Arc::new(Twice), ""),
            Err(RegistrationError::DuplicateMethod {
                service: "Twice".into(),
                method: "Same".into(),
            })
        );
        assert_eq!(registry.len(), 1, "failed registrations leave no trace");
    }

    #[test]
    fn lookup_errors() {
        let mut registry = ServiceRegistry::new();
        registry.register(Arc::new(Counter), "").unwrap();

        assert!(matches!(
            registry.lookup("Counter"),
            Err(RpcError::IllFormedMethod(name)) if name == "Counter"
        ));
        assert!(matches!(
            registry.lookup("Counter.Bump.Again"),
            Err(RpcError::IllFormedMethod(_))
        ));
        assert!(matches!(
            registry.lookup("Counter.Reset"),
            Err(RpcError::MethodNotFound(name)) if name == "Counter.Reset"
        ));
        assert!(matches!(
            registry.lookup("Nope.Bump"),
            Err(RpcError::MethodNotFound(_))
        ));
        assert!(!registry.has_method("counter.Bump"), "names are case-sensitive");
    }

    #[tokio::test]
    async fn spec_invokes_bound_receiver() {
        let mut registry = ServiceRegistry::new();
        registry.register(Arc::new(Counter), "").unwrap();
        let spec = registry.lookup("Counter.Bump").unwrap();
        assert_eq!(spec.qualified_name(), "Counter.Bump");
        assert_eq!(spec.shape(), MethodShape::Plain);

        let request = http::Request::new(Bytes::new());
        let ctx = Context::new(&request, spec.qualified_name());
        let args: Box<Args> = Box::new(Count(41));
        let mut reply = spec.new_reply();
        let mut headers = HeaderMap::new();

        spec.invoke(&ctx, &*args, &mut *reply, &mut headers)
            .await
            .unwrap();
        assert_eq!(reply.downcast_ref::<Count>().unwrap().0, 42);
    }
}
