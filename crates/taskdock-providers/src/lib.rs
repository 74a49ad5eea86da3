pub mod factory;
pub mod fallback;
pub mod fetch;
pub mod registry;
pub mod teamwork;
pub mod transport;

pub use factory::{build_provider, known_descriptors, ProviderContext};
pub use fallback::{FallbackProvider, FALLBACK_DESCRIPTOR};
pub use fetch::{fetch, query_string, unwrap_envelope, RestCredentials};
pub use registry::ProviderRegistry;
pub use teamwork::{TeamworkProvider, TEAMWORK_DESCRIPTOR};
pub use transport::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError,
};
