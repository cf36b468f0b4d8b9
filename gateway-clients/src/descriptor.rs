//! Service descriptors.

use gateway_http_client::RemoteCall;

/// Immutable description of one downstream service: its name, the value
/// returned when a call fails, and the remote operation.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor<T> {
    name: String,
    fallback: T,
    call: RemoteCall<T>,
}

impl<T> ServiceDescriptor<T> {
    /// Create a descriptor.
    pub fn new(name: impl Into<String>, fallback: T, call: RemoteCall<T>) -> Self {
        Self {
            name: name.into(),
            fallback,
            call,
        }
    }

    /// Short lowercase identifier, used for endpoint resolution and as the
    /// span and log tag.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value returned when the call cannot be completed.
    pub fn fallback(&self) -> &T {
        &self.fallback
    }

    /// Remote operation.
    pub fn call(&self) -> &RemoteCall<T> {
        &self.call
    }
}

impl ServiceDescriptor<String> {
    /// Greeting service `name`: `GET api/{name}` returning text, with the
    /// fallback `"{Name} response (fallback)"`.
    pub fn greeting(name: &str) -> Self {
        Self::new(
            name,
            format!("{} response (fallback)", capitalize(name)),
            RemoteCall::get_text(format!("api/{}", name)),
        )
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
