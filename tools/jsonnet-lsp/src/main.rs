// Jsonnet language server.
//
// Transport glue only: the analysis core lives in the `jsonnet_*` crates.
// Speaks LSP over stdio; logs go to stderr so stdout stays a clean
// protocol channel.

mod convert;
mod external;
mod server;

use tower_lsp::{LspService, Server};
use tracing_subscriber::{prelude::*, EnvFilter, Registry};

/// Log filtering via `JSONNET_LSP_LOG` (falling back to `RUST_LOG`),
/// defaulting to `warn`.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("JSONNET_LSP_LOG")
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    Registry::default()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(server::JsonnetLanguageServer::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}
